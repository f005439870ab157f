//! CLI command implementations.

mod reset;
mod setup;
mod status;

pub use reset::reset;
pub use setup::setup;
pub use status::status;

use anyhow::Result;
use setup_config_and_utils::{Config, Paths};

/// Resolved paths and configuration for one invocation.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
}

impl Context {
    /// Load paths and configuration, applying command-line overrides.
    pub fn load(no_browser: bool) -> Result<Self> {
        let paths = Paths::new()?;
        let mut config = Config::load(&paths)?;
        if no_browser {
            config.open_browser = false;
        }
        Ok(Self { paths, config })
    }
}
