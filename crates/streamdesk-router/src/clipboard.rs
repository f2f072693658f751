//! Clipboard provider seam and the outbound change monitor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use streamdesk_types::ClipboardPolicy;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::RouterError;
use crate::events::RouterEvents;

/// Reads and writes the session clipboard.
#[async_trait]
pub trait ClipboardAccess: Send + Sync + 'static {
    async fn read(&self) -> Result<String, RouterError>;

    async fn write(&self, text: &str) -> Result<(), RouterError>;
}

/// Polls the clipboard for outbound changes.
///
/// While the policy permits reads, new non-empty clipboard content is
/// forwarded to [`RouterEvents::on_clipboard_read`] once per change. The
/// monitor never forwards the same content twice in a row.
pub struct ClipboardMonitor {
    policy: ClipboardPolicy,
    provider: Arc<dyn ClipboardAccess>,
    events: Arc<dyn RouterEvents>,
    interval: Duration,
}

impl ClipboardMonitor {
    pub fn new(
        policy: ClipboardPolicy,
        provider: Arc<dyn ClipboardAccess>,
        events: Arc<dyn RouterEvents>,
    ) -> Self {
        Self {
            policy,
            provider,
            events,
            interval: Duration::from_millis(500),
        }
    }

    /// Override the poll interval, mainly for tests.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until shutdown. Returns immediately when the policy forbids
    /// outbound content.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if !self.policy.allows_read() {
            info!("outbound clipboard disabled, skipping monitor");
            return;
        }
        info!("starting clipboard monitor");

        let mut last = String::new();
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }

            match self.provider.read().await {
                Ok(current) => {
                    if !current.is_empty() && current != last {
                        info!(length = current.len(), "forwarding clipboard content");
                        self.events.on_clipboard_read(&current);
                        last = current;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "clipboard read failed");
                }
            }
        }
        info!("stopping clipboard monitor");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EventCall, MockClipboard, RecordingEvents};

    #[tokio::test]
    async fn forwards_each_change_once() {
        let provider = Arc::new(MockClipboard::new());
        let events = Arc::new(RecordingEvents::new());
        let monitor = ClipboardMonitor::new(
            ClipboardPolicy::Bidirectional,
            Arc::clone(&provider) as Arc<dyn ClipboardAccess>,
            Arc::clone(&events) as Arc<dyn RouterEvents>,
        )
        .with_interval(Duration::from_millis(5));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(monitor.run(shutdown_rx));

        provider.set_content("one");
        tokio::time::sleep(Duration::from_millis(40)).await;
        // Same content again must not re-fire.
        provider.set_content("one");
        tokio::time::sleep(Duration::from_millis(40)).await;
        provider.set_content("two");
        tokio::time::sleep(Duration::from_millis(40)).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(
            events.calls(),
            vec![
                EventCall::ClipboardRead("one".to_string()),
                EventCall::ClipboardRead("two".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn disabled_policy_returns_immediately() {
        let provider = Arc::new(MockClipboard::new());
        let events = Arc::new(RecordingEvents::new());
        provider.set_content("never forwarded");

        let monitor = ClipboardMonitor::new(
            ClipboardPolicy::Inbound,
            Arc::clone(&provider) as Arc<dyn ClipboardAccess>,
            Arc::clone(&events) as Arc<dyn RouterEvents>,
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        monitor.run(shutdown_rx).await;

        assert!(events.calls().is_empty());
    }
}
