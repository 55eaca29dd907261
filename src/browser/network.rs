//! Network activity tracking used to decide when a page has settled

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

/// Tracks which requests on a page are still in flight, by request id.
///
/// A request enters the set when it is sent and leaves when it finishes
/// loading or fails. Redirect hops reuse their request's id, so a chain of
/// redirects stays a single entry. The page is quiet once the set has been
/// empty for a full quiet window.
#[derive(Debug, Default)]
pub struct NetworkMonitor {
    in_flight: Mutex<HashSet<String>>,
    changed: Notify,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A request (or a redirect hop of one) was sent
    pub fn request_started(&self, request_id: &str) {
        self.pending().insert(request_id.to_string());
        self.changed.notify_waiters();
    }

    /// A request finished loading or failed. Unknown ids are ignored, so
    /// requests sent before tracking began cannot hide later ones.
    pub fn request_finished(&self, request_id: &str) {
        self.pending().remove(request_id);
        self.changed.notify_waiters();
    }

    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending().is_empty()
    }

    /// Wait until no request has been in flight for `quiet`, or until
    /// `timeout` elapses. Returns `true` when the page went quiet and
    /// `false` when the deadline won; neither outcome is an error.
    pub async fn wait_for_quiet(&self, quiet: Duration, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.quiet_period(quiet))
            .await
            .is_ok()
    }

    async fn quiet_period(&self, quiet: Duration) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before reading the set so no event is missed.
            notified.as_mut().enable();

            if self.is_idle() {
                tokio::select! {
                    _ = tokio::time::sleep(quiet) => {
                        if self.is_idle() {
                            return;
                        }
                    }
                    _ = &mut notified => {}
                }
            } else {
                notified.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const QUIET: Duration = Duration::from_millis(500);
    const TIMEOUT: Duration = Duration::from_secs(3);

    #[test]
    fn test_tracks_requests_by_id() {
        let monitor = NetworkMonitor::new();
        monitor.request_started("1");
        monitor.request_started("2");
        monitor.request_finished("1");
        assert_eq!(monitor.in_flight(), 1);
        assert!(!monitor.is_idle());
        monitor.request_finished("2");
        assert!(monitor.is_idle());
    }

    #[test]
    fn test_redirect_hops_count_once() {
        let monitor = NetworkMonitor::new();
        // 302 then 200: two requestWillBeSent with one id, one loadingFinished
        monitor.request_started("nav-1");
        monitor.request_started("nav-1");
        assert_eq!(monitor.in_flight(), 1);
        monitor.request_finished("nav-1");
        assert!(monitor.is_idle());
    }

    #[test]
    fn test_finishes_for_untracked_requests_do_not_hide_new_ones() {
        let monitor = NetworkMonitor::new();
        // requests that started before the listener attached
        monitor.request_finished("early-1");
        monitor.request_finished("early-2");

        monitor.request_started("xhr-7");
        assert!(!monitor.is_idle());
        assert_eq!(monitor.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_page_settles_after_window() {
        let monitor = NetworkMonitor::new();
        let start = tokio::time::Instant::now();
        assert!(monitor.wait_for_quiet(QUIET, TIMEOUT).await);
        assert_eq!(start.elapsed(), QUIET);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_request_hits_timeout() {
        let monitor = NetworkMonitor::new();
        monitor.request_started("slow");
        let start = tokio::time::Instant::now();
        assert!(!monitor.wait_for_quiet(QUIET, TIMEOUT).await);
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_after_redirected_navigation() {
        let monitor = Arc::new(NetworkMonitor::new());
        monitor.request_started("nav-1");
        monitor.request_started("nav-1");

        let background = Arc::clone(&monitor);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            background.request_finished("nav-1");
        });

        let start = tokio::time::Instant::now();
        assert!(monitor.wait_for_quiet(QUIET, TIMEOUT).await);
        assert_eq!(start.elapsed(), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_restarts_quiet_window() {
        let monitor = Arc::new(NetworkMonitor::new());

        let background = Arc::clone(&monitor);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            background.request_started("xhr-1");
            tokio::time::sleep(Duration::from_millis(100)).await;
            background.request_finished("xhr-1");
        });

        let start = tokio::time::Instant::now();
        assert!(monitor.wait_for_quiet(QUIET, TIMEOUT).await);
        assert_eq!(start.elapsed(), Duration::from_millis(800));
    }
}
