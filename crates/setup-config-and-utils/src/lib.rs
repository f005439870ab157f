//! Configuration, paths, errors and device-login crypto for the GateFlow setup tools.

mod config;
pub mod device_login_crypto;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_DASHBOARD_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_TOKEN_LABEL_PREFIX,
};
pub use device_login_crypto::{decrypt_device_token, seal_device_token, EphemeralKeyPair};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
