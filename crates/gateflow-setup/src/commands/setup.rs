//! The setup flow itself.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use supabase_bootstrap::{SetupArgs, SetupOrchestrator, SetupOutcome};

/// Run one setup step. Returns whether the outcome is an error.
pub async fn setup(ctx: &Context, args: SetupArgs, format: &OutputFormat) -> Result<bool> {
    let orchestrator = SetupOrchestrator::new(&ctx.config, &ctx.paths)?;
    let outcome = orchestrator.run(args).await;
    print_outcome(&outcome, format);
    Ok(outcome.is_error())
}

fn print_outcome(outcome: &SetupOutcome, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            let text = outcome.render_text();
            if outcome.is_error() {
                eprint!("{}", text);
            } else {
                print!("{}", text);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => output::print_error(&e.to_string(), format),
        },
    }
}
