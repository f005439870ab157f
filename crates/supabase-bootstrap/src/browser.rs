//! Opening the authorization URL.

/// Opens a URL in the user's default handler.
pub trait BrowserOpener: Send + Sync {
    /// Try to open `url`. Returns whether the handler was launched.
    fn open(&self, url: &str) -> bool;
}

/// Uses the platform's default URL handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> bool {
        match open::that_detached(url) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "could not open browser");
                false
            }
        }
    }
}

/// Never opens anything. Used for headless runs and `--no-browser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

impl BrowserOpener for NoBrowser {
    fn open(&self, _url: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_browser_never_opens() {
        assert!(!NoBrowser.open("https://supabase.com/dashboard"));
    }
}
