//! Two-page navigation and extraction for one episode lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use recap_core::{Error, Result};

use crate::binding::{Page, PageSetup};
use crate::extract;
use crate::session::SessionManager;

pub const DEFAULT_INDEX_URL: &str = "https://starwars.fandom.com/wiki/Andor_Season_2#episodes";

const SUCCESS_STATUSES: [u16; 2] = [200, 304];

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Index page listing the episode table.
    pub index_url: String,
    /// Bound on each individual navigation.
    pub nav_timeout: Duration,
    /// Total attempts for the episode page (initial + retries).
    pub attempts: u32,
    /// Wait between failed episode-page attempts.
    pub backoff: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            nav_timeout: Duration::from_secs(30),
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Outcome of one extraction run. "Not found" is a normal result, never an
/// error, and never carries partial text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scraped {
    Found(String),
    NotFound,
}

/// Looks an episode up on the index page, follows its link, and extracts
/// the plot-summary text.
pub struct EpisodeScraper {
    sessions: Arc<SessionManager>,
    config: ScrapeConfig,
    setup: PageSetup,
}

impl EpisodeScraper {
    pub fn new(sessions: Arc<SessionManager>, config: ScrapeConfig) -> Self {
        Self {
            sessions,
            config,
            setup: PageSetup::default(),
        }
    }

    /// Fetch the plot-summary text for `query` (episode number or title,
    /// matched exactly against the index table after trimming).
    pub async fn fetch_plot(&self, query: &str) -> Result<Scraped> {
        let query = query.trim();
        let browser = self.sessions.acquire().await?;
        let page = browser.new_page(&self.setup).await?;
        let result = self.run(query, page.as_ref()).await;
        // The page context is closed on success and failure alike.
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }
        result
    }

    async fn run(&self, query: &str, page: &dyn Page) -> Result<Scraped> {
        info!(query, "looking up episode");

        let status = page
            .goto(&self.config.index_url, self.config.nav_timeout)
            .await?;
        if status != 200 {
            return Err(Error::navigation(status, self.config.index_url.clone()));
        }

        let html = page.content().await?;
        let Some(href) = extract::episode_href(&html, query) else {
            debug!(query, "no matching row or title link in episode table");
            return Ok(Scraped::NotFound);
        };

        let episode_url = Url::parse(&self.config.index_url)
            .and_then(|base| base.join(&href))
            .map_err(|e| Error::config(format!("cannot resolve episode link {href}: {e}")))?;

        let status = self.goto_with_retry(page, episode_url.as_str()).await?;
        debug!(status, url = %episode_url, "episode page loaded");

        let html = page.content().await?;
        match extract::plot_summary(&html) {
            Some(text) => Ok(Scraped::Found(text)),
            None => {
                debug!(query, "episode page has no plot summary content");
                Ok(Scraped::NotFound)
            }
        }
    }

    /// Navigate to the episode page with retries. 304 counts as success
    /// since the content is still readable.
    async fn goto_with_retry(&self, page: &dyn Page, url: &str) -> Result<u16> {
        let mut last_failure: Option<Error> = None;
        for attempt in 1..=self.config.attempts {
            match page.goto(url, self.config.nav_timeout).await {
                Ok(status) if SUCCESS_STATUSES.contains(&status) => return Ok(status),
                Ok(status) => {
                    warn!(attempt, status, url, "episode page returned non-success status");
                    last_failure = Some(Error::navigation(status, url));
                }
                Err(e) => {
                    warn!(attempt, error = %e, url, "episode page navigation failed");
                    last_failure = Some(e);
                }
            }
            if attempt < self.config.attempts {
                tokio::time::sleep(self.config.backoff).await;
            }
        }
        Err(last_failure.unwrap_or_else(|| Error::navigation(0, url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DEFAULT_SESSION_TTL;
    use crate::testing::{FakeBrowser, FakeLauncher};

    const INDEX_URL: &str = "https://wiki.test/Andor_Season_2";
    const EPISODE_URL: &str = "https://wiki.test/wiki/Catalyst";

    const INDEX_HTML: &str = r#"
        <html><body>
        <table>
          <tr><th>#</th><th>Aired</th><th>Title</th></tr>
          <tr><td>1</td><td>2025-04-22</td><td><a href="/wiki/Catalyst">Catalyst</a></td></tr>
        </table>
        </body></html>
    "#;

    const EPISODE_HTML: &str = r#"
        <html><body>
        <h2>Plot Summary</h2>
        <h3>Catalyst</h3>
        <p>Cassian escapes.</p>
        <div>Credits</div>
        </body></html>
    "#;

    fn scraper_with(browser: Arc<FakeBrowser>) -> EpisodeScraper {
        let launcher = Arc::new(FakeLauncher::with_browser(browser));
        let sessions = Arc::new(SessionManager::new(launcher, DEFAULT_SESSION_TTL));
        EpisodeScraper::new(
            sessions,
            ScrapeConfig {
                index_url: INDEX_URL.to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn end_to_end_extraction() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 200, EPISODE_HTML);

        let scraper = scraper_with(browser.clone());
        let result = scraper.fetch_plot("1").await.unwrap();

        assert_eq!(
            result,
            Scraped::Found("Catalyst\nCassian escapes.".to_string())
        );
        assert_eq!(browser.goto_urls(), vec![INDEX_URL, EPISODE_URL]);
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test]
    async fn missing_episode_is_not_found_without_second_navigation() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);

        let scraper = scraper_with(browser.clone());
        let result = scraper.fetch_plot("99").await.unwrap();

        assert_eq!(result, Scraped::NotFound);
        assert_eq!(browser.goto_urls(), vec![INDEX_URL]);
    }

    #[tokio::test]
    async fn query_is_trimmed_before_matching() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 200, EPISODE_HTML);

        let scraper = scraper_with(browser);
        let result = scraper.fetch_plot("  1  ").await.unwrap();
        assert!(matches!(result, Scraped::Found(_)));
    }

    #[tokio::test]
    async fn index_non_success_status_is_fatal() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 403, "<html></html>");

        let scraper = scraper_with(browser.clone());
        let err = scraper.fetch_plot("1").await.unwrap_err();

        assert!(matches!(err, Error::Navigation { status: 403, .. }));
        // Page still closed on the failure path.
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn episode_page_retries_three_times_with_backoff() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 503, "<html></html>");

        let scraper = scraper_with(browser.clone());
        let err = scraper.fetch_plot("1").await.unwrap_err();

        assert!(matches!(err, Error::Navigation { status: 503, .. }));
        let times = browser.goto_times(EPISODE_URL);
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        // Page still closed after exhausting the retry budget.
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn episode_page_recovers_within_retry_budget() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 503, "<html></html>");
        browser.fail(EPISODE_URL, "connection reset");
        browser.serve(EPISODE_URL, 200, EPISODE_HTML);

        let scraper = scraper_with(browser.clone());
        let result = scraper.fetch_plot("1").await.unwrap();

        assert!(matches!(result, Scraped::Found(_)));
        assert_eq!(browser.goto_times(EPISODE_URL).len(), 3);
    }

    #[tokio::test]
    async fn not_modified_counts_as_success() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 304, EPISODE_HTML);

        let scraper = scraper_with(browser.clone());
        let result = scraper.fetch_plot("1").await.unwrap();

        assert!(matches!(result, Scraped::Found(_)));
        // No retries: one visit.
        assert_eq!(browser.goto_times(EPISODE_URL).len(), 1);
    }

    #[tokio::test]
    async fn episode_page_without_summary_is_not_found() {
        let browser = Arc::new(FakeBrowser::new());
        browser.serve(INDEX_URL, 200, INDEX_HTML);
        browser.serve(EPISODE_URL, 200, "<html><body><h2>Trivia</h2></body></html>");

        let scraper = scraper_with(browser);
        let result = scraper.fetch_plot("1").await.unwrap();
        assert_eq!(result, Scraped::NotFound);
    }
}
