//! Real browser binding over the Chrome DevTools Protocol.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowserInner, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page as CdpPageInner;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use recap_core::{Error, Result};

use crate::binding::{Browser, BrowserLauncher, Page, PageSetup};

/// Launch configuration for the CDP browser.
#[derive(Debug, Clone)]
pub struct CdpConfig {
    pub headless: bool,
    /// Explicit Chrome/Chromium binary. None = autodetect.
    pub executable: Option<PathBuf>,
    /// Needed when running as root in containers.
    pub no_sandbox: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            no_sandbox: false,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

pub struct CdpLauncher {
    config: CdpConfig,
}

impl CdpLauncher {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for CdpLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>> {
        let mut builder = BrowserConfig::builder().viewport(Viewport {
            width: self.config.viewport_width,
            height: self.config.viewport_height,
            ..Default::default()
        });
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        if self.config.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }
        let config = builder.build().map_err(Error::browser)?;

        debug!("launching chromium");
        let (browser, mut handler) = CdpBrowserInner::launch(config)
            .await
            .map_err(|e| Error::browser(format!("failed to launch browser: {e}")))?;

        // The handler stream must be polled for the browser to function.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Arc::new(CdpBrowser {
            browser: Mutex::new(browser),
            handler_task,
        }))
    }
}

pub struct CdpBrowser {
    browser: Mutex<CdpBrowserInner>,
    handler_task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl Browser for CdpBrowser {
    async fn new_page(&self, setup: &PageSetup) -> Result<Box<dyn Page>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| Error::browser(format!("failed to open page: {e}")))?
        };

        page.set_user_agent(setup.user_agent.as_str())
            .await
            .map_err(|e| Error::browser(format!("failed to set user agent: {e}")))?;

        let headers = serde_json::json!({
            "Accept": setup.accept,
            "Accept-Language": setup.accept_language,
        });
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(|e| Error::browser(format!("failed to set headers: {e}")))?;

        // The wiki's inline scripts are what render the episode table.
        page.execute(SetBypassCspParams::new(true))
            .await
            .map_err(|e| Error::browser(format!("failed to bypass CSP: {e}")))?;

        Ok(Box::new(CdpPage { page }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| Error::browser(format!("failed to close browser: {e}")))?;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler_task.abort();
        Ok(())
    }
}

struct CdpPage {
    page: CdpPageInner,
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<u16> {
        let navigate = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| Error::network(format!("navigation to {url} failed: {e}")))?;
            let response = self
                .page
                .wait_for_navigation_response()
                .await
                .map_err(|e| Error::network(format!("waiting for {url} failed: {e}")))?;
            let status = response
                .and_then(|r| r.response.as_ref().map(|res| res.status as u16))
                .unwrap_or(0);
            debug!(url, status, "navigation finished");
            Ok(status)
        };

        tokio::time::timeout(timeout, navigate)
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "navigation to {url} exceeded {}s",
                    timeout.as_secs()
                ))
            })?
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| Error::browser(format!("failed to read page content: {e}")))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| Error::browser(format!("failed to close page: {e}")))
    }
}
