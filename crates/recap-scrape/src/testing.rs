//! Test doubles for the browser binding.
//! Only compiled when running tests or with the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use recap_core::{Error, Result};

use crate::binding::{Browser, BrowserLauncher, Page, PageSetup};

/// One scripted navigation outcome.
#[derive(Debug, Clone)]
pub enum FakeVisit {
    /// Respond with this HTTP status and document body.
    Html { status: u16, body: String },
    /// Fail the navigation itself.
    Failure(String),
}

#[derive(Default)]
struct FakeState {
    routes: Mutex<HashMap<String, VecDeque<FakeVisit>>>,
    goto_log: Mutex<Vec<(String, Instant)>>,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    closed: AtomicUsize,
}

/// A scripted in-memory browser. Routes map URLs to visit queues; when a
/// queue is down to its last entry that entry repeats for further visits.
#[derive(Default)]
pub struct FakeBrowser {
    state: Arc<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful visit for `url`.
    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.state
            .routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(FakeVisit::Html {
                status,
                body: body.to_string(),
            });
    }

    /// Script a failed navigation for `url`.
    pub fn fail(&self, url: &str, message: &str) {
        self.state
            .routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(FakeVisit::Failure(message.to_string()));
    }

    /// URLs visited, in order.
    pub fn goto_urls(&self) -> Vec<String> {
        self.state
            .goto_log
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Visit timestamps for one URL, in order.
    pub fn goto_times(&self, url: &str) -> Vec<Instant> {
        self.state
            .goto_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(visited, _)| visited == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn pages_opened(&self) -> usize {
        self.state.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.state.pages_closed.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self, _setup: &PageSetup) -> Result<Box<dyn Page>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: self.state.clone(),
            current: Mutex::new(String::new()),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    current: Mutex<String>,
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<u16> {
        self.state
            .goto_log
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let visit = {
            let mut routes = self.state.routes.lock().unwrap();
            let queue = routes
                .get_mut(url)
                .ok_or_else(|| Error::network(format!("no scripted visit for {url}")))?;
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue
                    .front()
                    .cloned()
                    .ok_or_else(|| Error::network(format!("no scripted visit for {url}")))?
            }
        };

        match visit {
            FakeVisit::Html { status, body } => {
                *self.current.lock().unwrap() = body;
                Ok(status)
            }
            FakeVisit::Failure(message) => Err(Error::network(message)),
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn close(&self) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A launcher handing out one shared [`FakeBrowser`], counting launches and
/// optionally failing the next attempt.
pub struct FakeLauncher {
    browser: Arc<FakeBrowser>,
    launches: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::with_browser(Arc::new(FakeBrowser::new()))
    }
}

impl FakeLauncher {
    pub fn with_browser(browser: Arc<FakeBrowser>) -> Self {
        Self {
            browser,
            launches: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
        }
    }

    pub fn fail_next_launch(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.browser.closed_count()
    }

    pub fn browser(&self) -> Arc<FakeBrowser> {
        self.browser.clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(Error::browser(message));
        }
        Ok(self.browser.clone())
    }
}
