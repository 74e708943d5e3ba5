//! Single-slot browser session lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use recap_core::Result;

use crate::binding::{Browser, BrowserLauncher};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

struct Slot {
    browser: Arc<dyn Browser>,
    opened_at: Instant,
}

/// Owns at most one live browser handle.
///
/// `acquire()` hands out the cached handle while it is younger than the TTL
/// and relaunches otherwise. The whole acquisition runs inside one async
/// mutex critical section, so concurrent callers never race into duplicate
/// launches: a late caller parks on the lock and then observes whatever the
/// first caller left behind (a fresh session, or an empty slot after a
/// failure, in which case it retries the launch itself).
///
/// Known limitation: because only one session exists, a relaunch triggered
/// by one caller's expiry check invalidates pages other concurrent callers
/// may still be using. Callers get no per-page lease.
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    ttl: Duration,
    slot: Mutex<Option<Slot>>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, ttl: Duration) -> Self {
        Self {
            launcher,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns a usable browser handle, launching or relaunching as needed.
    pub async fn acquire(&self) -> Result<Arc<dyn Browser>> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref() {
            if current.opened_at.elapsed() < self.ttl {
                debug!("reusing cached browser session");
                return Ok(current.browser.clone());
            }
            // Expired: tear down before replacing. Teardown failures must
            // not block the relaunch.
            let expired = slot.take();
            if let Some(expired) = expired {
                info!("browser session expired, relaunching");
                if let Err(e) = expired.browser.close().await {
                    warn!(error = %e, "failed to close expired browser session");
                }
            }
        }

        // Slot is empty here; on launch failure it stays empty so the next
        // call retries cleanly.
        let browser = self.launcher.launch().await?;
        info!("browser session ready");
        *slot = Some(Slot {
            browser: browser.clone(),
            opened_at: Instant::now(),
        });
        Ok(browser)
    }

    /// Idempotently tears down the current session, if any.
    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.take() {
            info!("closing browser session");
            if let Err(e) = current.browser.close().await {
                warn!(error = %e, "failed to close browser session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLauncher;

    #[tokio::test]
    async fn acquire_launches_once_and_caches() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL);

        manager.acquire().await.unwrap();
        manager.acquire().await.unwrap();

        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_acquires_share_one_launch() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = Arc::new(SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL));

        let (a, b, c) = tokio::join!(manager.acquire(), manager.acquire(), manager.acquire());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(c.is_ok());

        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_is_torn_down_and_relaunched() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL);

        manager.acquire().await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        manager.acquire().await.unwrap();

        assert_eq!(launcher.launch_count(), 2);
        assert_eq!(launcher.closed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_below_ttl_is_not_relaunched() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL);

        manager.acquire().await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        manager.acquire().await.unwrap();

        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test]
    async fn failed_launch_clears_slot_for_retry() {
        let launcher = Arc::new(FakeLauncher::default());
        launcher.fail_next_launch("chrome exploded");
        let manager = SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL);

        assert!(manager.acquire().await.is_err());
        // Next call retries cleanly instead of returning a dead handle.
        assert!(manager.acquire().await.is_ok());
        assert_eq!(launcher.launch_count(), 2);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = SessionManager::new(launcher.clone(), DEFAULT_SESSION_TTL);

        manager.acquire().await.unwrap();
        manager.release().await;
        manager.release().await;

        assert_eq!(launcher.closed_count(), 1);
    }
}
