//! Storage key constants.

/// Storage keys used by the [`SecureStorage`](crate::SecureStorage) backends.
pub struct StorageKeys;

impl StorageKeys {
    /// Pending device-login session (JSON)
    pub const PENDING_SESSION: &'static str = "gateflow_pending_session";

    /// Supabase platform access token
    pub const SUPABASE_ACCESS_TOKEN: &'static str = "supabase_access_token";
}
