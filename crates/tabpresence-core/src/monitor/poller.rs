use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::snapshot::Snapshotter;
use crate::browsers::{BrowserCatalog, BrowserState};
use crate::presence::PresencePublisher;
use crate::system::ProcessSource;

/// Consecutive failed ticks after which monitoring gives up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Notification sent from the poll loop to the foreground
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Human-readable status line
    Status(String),
    /// A new browser state was published
    BrowserChanged(BrowserState),
    /// The loop has exited and will not tick again
    Stopped(StopReason),
}

/// Why the poll loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop was requested through the handle
    Requested,
    /// `MAX_CONSECUTIVE_ERRORS` ticks failed in a row
    TooManyErrors,
    /// The loop task panicked or was aborted
    Aborted,
}

/// Outcome of comparing the current sample against the last published one
#[derive(Debug, Clone)]
pub enum Transition {
    /// New or changed activity: publish it
    Publish(BrowserState),
    /// Browser went away: clear presence
    Clear,
    /// Nothing to do
    Unchanged,
}

/// Decide what a tick must do
///
/// Only (browser name, tab title, incognito flag) count as a change, so URL
/// jitter and fresh timestamps never cause a republish.
pub fn detect_change(last: Option<&BrowserState>, current: Option<BrowserState>) -> Transition {
    match (last, current) {
        (Some(last), Some(current)) if last.same_activity(&current) => Transition::Unchanged,
        (_, Some(current)) => Transition::Publish(current),
        (Some(_), None) => Transition::Clear,
        (None, None) => Transition::Unchanged,
    }
}

/// Mutable loop state, owned by the loop task alone
#[derive(Debug, Default)]
pub struct PollState {
    /// Last state handed to the publisher
    pub last: Option<BrowserState>,
    /// Consecutive failed ticks
    pub error_count: u32,
}

impl PollState {
    fn record_success(&mut self) {
        self.error_count = 0;
    }

    /// Count a failure; true once the error budget is spent
    fn record_error(&mut self) -> bool {
        self.error_count += 1;
        self.error_count >= MAX_CONSECUTIVE_ERRORS
    }
}

/// Sequential sample → diff → publish loop
pub struct PollLoop {
    catalog: Arc<BrowserCatalog>,
    source: Arc<dyn ProcessSource>,
    publisher: Box<dyn PresencePublisher>,
    interval: Duration,
    events: mpsc::UnboundedSender<MonitorEvent>,
}

impl PollLoop {
    pub fn new(
        catalog: Arc<BrowserCatalog>,
        source: Arc<dyn ProcessSource>,
        publisher: Box<dyn PresencePublisher>,
        interval: Duration,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Self {
        Self {
            catalog,
            source,
            publisher,
            interval,
            events,
        }
    }

    /// Run until cancelled or out of error budget, then hand the publisher
    /// back so the caller can release it
    ///
    /// Cancellation is checked before every tick and while sleeping. The
    /// delay runs from the end of one tick to the start of the next.
    pub async fn run(
        mut self,
        mut cancel: watch::Receiver<bool>,
    ) -> (Box<dyn PresencePublisher>, StopReason) {
        let mut state = PollState::default();

        let reason = loop {
            if *cancel.borrow() {
                break StopReason::Requested;
            }

            match self.tick(&mut state) {
                Ok(()) => state.record_success(),
                Err(e) => {
                    let exhausted = state.record_error();
                    warn!("Tick failed ({}/{}): {:#}", state.error_count, MAX_CONSECUTIVE_ERRORS, e);
                    self.status(format!(
                        "Monitoring error ({}/{}): {:#}",
                        state.error_count, MAX_CONSECUTIVE_ERRORS, e
                    ));
                    if exhausted {
                        error!("Error budget exhausted, stopping monitor");
                        self.status("Too many errors. Stopping monitoring.".to_string());
                        break StopReason::TooManyErrors;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = cancel.changed() => {
                    // Sender dropped counts as cancellation
                    if changed.is_err() || *cancel.borrow() {
                        break StopReason::Requested;
                    }
                }
            }
        };

        debug!("Poll loop exited: {:?}", reason);
        let _ = self.events.send(MonitorEvent::Stopped(reason));
        (self.publisher, reason)
    }

    /// Perform a single tick
    pub fn tick(&mut self, state: &mut PollState) -> Result<()> {
        let current = Snapshotter::new(&self.catalog, self.source.as_ref()).active_browser()?;

        match detect_change(state.last.as_ref(), current) {
            Transition::Publish(browser) => {
                self.publisher.publish(&browser)?;
                let _ = self
                    .events
                    .send(MonitorEvent::BrowserChanged(browser.clone()));
                self.status(browser.status_line());
                state.last = Some(browser);
            }
            Transition::Clear => {
                self.publisher.clear()?;
                state.last = None;
                self.status("No active browser detected".to_string());
            }
            Transition::Unchanged => {}
        }

        Ok(())
    }

    fn status(&self, message: String) {
        info!("{}", message);
        let _ = self.events.send(MonitorEvent::Status(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceError;
    use crate::system::ProcessInfo;
    use std::sync::Mutex;

    struct FixedSource(Vec<ProcessInfo>);

    impl ProcessSource for FixedSource {
        fn processes(&self) -> Result<Vec<ProcessInfo>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CountingPublisher {
        published: Arc<Mutex<Vec<String>>>,
        clears: Arc<Mutex<u32>>,
    }

    impl PresencePublisher for CountingPublisher {
        fn name(&self) -> &str {
            "counting"
        }
        fn initialize(&mut self) -> Result<(), PresenceError> {
            Ok(())
        }
        fn publish(&mut self, state: &BrowserState) -> Result<(), PresenceError> {
            self.published.lock().unwrap().push(state.tab_title.clone());
            Ok(())
        }
        fn clear(&mut self) -> Result<(), PresenceError> {
            *self.clears.lock().unwrap() += 1;
            Ok(())
        }
        fn dispose(&mut self) {}
    }

    fn chrome(title: &str) -> BrowserState {
        let catalog = BrowserCatalog::builtin();
        crate::detectors::TitleClassifier::new()
            .classify(catalog.get("chrome").unwrap(), title)
            .unwrap()
    }

    fn poll_loop(
        processes: Vec<ProcessInfo>,
        publisher: CountingPublisher,
    ) -> (PollLoop, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let poll_loop = PollLoop::new(
            Arc::new(BrowserCatalog::builtin()),
            Arc::new(FixedSource(processes)),
            Box::new(publisher),
            Duration::from_secs(2),
            tx,
        );
        (poll_loop, rx)
    }

    #[test]
    fn test_detect_change_table() {
        let a = chrome("GitHub - Google Chrome");
        let mut a_later = chrome("GitHub - Google Chrome");
        a_later.url = "https://github.com".to_string();
        let b = chrome("GitLab - Google Chrome");

        assert!(matches!(detect_change(None, None), Transition::Unchanged));
        assert!(matches!(
            detect_change(None, Some(a.clone())),
            Transition::Publish(_)
        ));
        assert!(matches!(
            detect_change(Some(&a), Some(a_later)),
            Transition::Unchanged
        ));
        assert!(matches!(
            detect_change(Some(&a), Some(b)),
            Transition::Publish(s) if s.tab_title == "GitLab"
        ));
        assert!(matches!(detect_change(Some(&a), None), Transition::Clear));
    }

    #[test]
    fn test_equal_consecutive_ticks_publish_once() {
        let publisher = CountingPublisher::default();
        let published = publisher.published.clone();
        let clears = publisher.clears.clone();
        let (mut poll_loop, mut rx) = poll_loop(
            vec![ProcessInfo::new(1, "chrome", "GitHub - Google Chrome")],
            publisher,
        );

        let mut state = PollState::default();
        poll_loop.tick(&mut state).unwrap();
        state.record_success();
        poll_loop.tick(&mut state).unwrap();
        state.record_success();

        assert_eq!(*published.lock().unwrap(), vec!["GitHub".to_string()]);
        assert_eq!(*clears.lock().unwrap(), 0);
        assert_eq!(state.error_count, 0);
        assert_eq!(state.last.as_ref().unwrap().tab_title, "GitHub");

        assert!(matches!(rx.try_recv(), Ok(MonitorEvent::BrowserChanged(_))));
        assert!(matches!(
            rx.try_recv(),
            Ok(MonitorEvent::Status(s)) if s == "Active: Google Chrome - GitHub"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_browser_gone_clears_once() {
        let publisher = CountingPublisher::default();
        let clears = publisher.clears.clone();
        let (mut poll_loop, mut rx) = poll_loop(Vec::new(), publisher);

        let mut state = PollState {
            last: Some(chrome("GitHub - Google Chrome")),
            error_count: 0,
        };
        poll_loop.tick(&mut state).unwrap();
        poll_loop.tick(&mut state).unwrap();

        assert_eq!(*clears.lock().unwrap(), 1);
        assert!(state.last.is_none());
        assert!(matches!(
            rx.try_recv(),
            Ok(MonitorEvent::Status(s)) if s == "No active browser detected"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_error_budget_accounting() {
        let mut state = PollState::default();
        for _ in 0..MAX_CONSECUTIVE_ERRORS - 1 {
            assert!(!state.record_error());
        }
        state.record_success();
        assert_eq!(state.error_count, 0);
        for _ in 0..MAX_CONSECUTIVE_ERRORS - 1 {
            assert!(!state.record_error());
        }
        assert!(state.record_error());
    }
}
