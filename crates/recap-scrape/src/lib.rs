//! recap-scrape: browser session management and episode plot extraction.
//!
//! The scraping core is split along a seam designed for testing:
//!
//! - [`binding`] defines the browser-automation contract ([`BrowserLauncher`],
//!   [`Browser`], [`Page`]) that the rest of the crate depends on;
//! - [`cdp`] implements that contract with a real headless Chrome via CDP;
//! - [`session`] owns the single cached browser handle with TTL and
//!   single-flight initialization;
//! - [`extract`] is pure HTML-in, text-out extraction logic;
//! - [`episode`] drives the two-page navigation with retries.

pub mod binding;
pub mod cdp;
pub mod episode;
pub mod extract;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use binding::{Browser, BrowserLauncher, Page, PageSetup};
pub use cdp::{CdpConfig, CdpLauncher};
pub use episode::{EpisodeScraper, ScrapeConfig, Scraped, DEFAULT_INDEX_URL};
pub use session::SessionManager;
