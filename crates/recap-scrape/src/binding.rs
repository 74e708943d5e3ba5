//! The browser-automation contract.
//!
//! Everything above this module works against these traits, never against a
//! concrete engine. The real implementation lives in [`crate::cdp`]; tests
//! inject fakes serving canned HTML.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use recap_core::Result;

/// Per-page configuration applied before any navigation.
///
/// The target wiki serves blocked or materially different content to
/// default non-browser clients, so pages carry a realistic desktop identity.
#[derive(Debug, Clone)]
pub struct PageSetup {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                     image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Launches browser instances. The expensive operation the session manager
/// guards with single-flight coordination.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Browser>>;
}

/// One running browser instance. Pages are cheap; the browser is not.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self, setup: &PageSetup) -> Result<Box<dyn Page>>;

    async fn close(&self) -> Result<()>;
}

/// One page/document context inside a browser.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url`, wait for the main document response, and return
    /// its HTTP status. The whole navigation is bounded by `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<u16>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}
