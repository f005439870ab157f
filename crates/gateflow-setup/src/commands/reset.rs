//! Discard login state. The deploy config is never touched.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use setup_storage::{FileSessionStore, FileTokenStore, SessionStateStore, TokenStore};
use tracing::info;

/// Clear the pending login and, with `all`, the stored access token.
pub async fn reset(ctx: &Context, all: bool, format: &OutputFormat) -> Result<()> {
    let cleared = clear_state(ctx, all)?;
    info!(all, token_removed = cleared, "setup state reset");

    let message = if all && cleared {
        "Pending login and stored access token removed."
    } else {
        "Pending login cleared."
    };
    output::print_success(message, format);
    Ok(())
}

/// Returns whether a stored token was removed.
fn clear_state(ctx: &Context, all: bool) -> Result<bool> {
    FileSessionStore::from_paths(&ctx.paths).clear()?;
    if all {
        Ok(FileTokenStore::from_paths(&ctx.paths).clear()?)
    } else {
        Ok(false)
    }
}
