use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::poller::{MonitorEvent, PollLoop, StopReason};
use crate::browsers::BrowserCatalog;
use crate::config::Settings;
use crate::presence::{PresenceError, PresencePublisher};
use crate::system::ProcessSource;

/// Default bound on the publisher handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why monitoring could not be started
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("presence handshake failed: {0}")]
    Handshake(#[source] PresenceError),

    #[error("presence handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("presence handshake task failed: {0}")]
    HandshakeAborted(String),
}

/// Entry point for starting the browser monitor
///
/// Holds everything a poll loop needs except the publisher, which is handed
/// over on [`Monitor::start`] and returned to the handle when the loop ends.
pub struct Monitor {
    catalog: Arc<BrowserCatalog>,
    source: Arc<dyn ProcessSource>,
    interval: Duration,
    handshake_timeout: Duration,
}

impl Monitor {
    /// Create a monitor with a 3 second interval and 5 second handshake
    pub fn new(catalog: BrowserCatalog, source: Arc<dyn ProcessSource>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            source,
            interval: Duration::from_secs(3),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Create a monitor using the interval and timeout from settings
    pub fn from_settings(
        settings: &Settings,
        catalog: BrowserCatalog,
        source: Arc<dyn ProcessSource>,
    ) -> Self {
        Self::new(catalog, source)
            .with_interval(settings.poll_interval())
            .with_handshake_timeout(settings.handshake_timeout())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &BrowserCatalog {
        &self.catalog
    }

    /// Handshake with the publisher, then spawn the poll loop
    ///
    /// The loop is not started when the handshake fails or does not finish
    /// within the timeout; the failure is reported once on `events` and
    /// returned.
    pub async fn start(
        &self,
        publisher: Box<dyn PresencePublisher>,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Result<MonitorHandle, MonitorError> {
        send_status(&events, "Connecting to presence service...");

        let publisher = match self.handshake(publisher).await {
            Ok(publisher) => publisher,
            Err(e) => {
                warn!("{}", e);
                send_status(&events, &format!("Failed to connect to presence service: {}", e));
                return Err(e);
            }
        };

        send_status(&events, "Starting browser monitoring...");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let poll_loop = PollLoop::new(
            self.catalog.clone(),
            self.source.clone(),
            publisher,
            self.interval,
            events.clone(),
        );
        let task = tokio::spawn(poll_loop.run(cancel_rx));

        Ok(MonitorHandle {
            cancel: cancel_tx,
            task: Some(task),
            events,
        })
    }

    async fn handshake(
        &self,
        mut publisher: Box<dyn PresencePublisher>,
    ) -> Result<Box<dyn PresencePublisher>, MonitorError> {
        let name = publisher.name().to_string();
        let mut handshake = tokio::task::spawn_blocking(move || {
            let result = publisher.initialize();
            (publisher, result)
        });

        match tokio::time::timeout(self.handshake_timeout, &mut handshake).await {
            Err(_) => {
                // The blocking handshake cannot be interrupted; dispose the
                // publisher whenever it comes back
                tokio::spawn(async move {
                    if let Ok((mut publisher, result)) = handshake.await {
                        debug!(
                            "Late handshake of '{}' finished (ok: {}), disposing",
                            name,
                            result.is_ok()
                        );
                        publisher.dispose();
                    }
                });
                Err(MonitorError::HandshakeTimeout(self.handshake_timeout))
            }
            Ok(Err(join_err)) => Err(MonitorError::HandshakeAborted(join_err.to_string())),
            Ok(Ok((mut publisher, Err(e)))) => {
                publisher.dispose();
                Err(MonitorError::Handshake(e))
            }
            Ok(Ok((publisher, Ok(())))) => {
                info!("Presence publisher '{}' connected", name);
                Ok(publisher)
            }
        }
    }
}

/// Handle to a running poll loop
pub struct MonitorHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<(Box<dyn PresencePublisher>, StopReason)>>,
    events: mpsc::UnboundedSender<MonitorEvent>,
}

impl MonitorHandle {
    /// Whether the loop is still ticking
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and release the publisher
    ///
    /// Waits for the loop task to exit, so no tick runs after this returns.
    /// The published presence is cleared and the publisher disposed.
    /// Returns why the loop ended, or `None` if it was already stopped.
    ///
    /// Dropping the handle also cancels the loop and releases the publisher,
    /// but in the background and without the "Monitoring stopped" status.
    pub async fn stop(&mut self) -> Option<StopReason> {
        let task = self.task.take()?;
        let _ = self.cancel.send(true);

        let reason = match task.await {
            Ok((publisher, reason)) => {
                release(publisher);
                reason
            }
            Err(e) => {
                warn!("Poll loop task failed: {}", e);
                StopReason::Aborted
            }
        };

        send_status(&self.events, "Monitoring stopped");
        Some(reason)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);

        let Some(task) = self.task.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Ok((publisher, _)) = task.await {
                        release(publisher);
                    }
                });
            }
            Err(_) => debug!("Monitor handle dropped outside a runtime, publisher not released"),
        }
    }
}

/// Clear the published presence and end the publisher session
fn release(mut publisher: Box<dyn PresencePublisher>) {
    if let Err(e) = publisher.clear() {
        warn!("Failed to clear presence on stop: {}", e);
    }
    publisher.dispose();
}

fn send_status(events: &mpsc::UnboundedSender<MonitorEvent>, message: &str) {
    info!("{}", message);
    let _ = events.send(MonitorEvent::Status(message.to_string()));
}
