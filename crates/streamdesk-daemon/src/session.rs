//! One client session: data-channel lines in, input injection out.

use std::sync::Arc;

use streamdesk_router::{
    ClipboardAccess, ClipboardMonitor, DisplayInput, GamepadFactory, InputRouter, RouterConfig,
    RouterEvents,
};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::config::SessionSection;
use crate::error::DaemonError;

/// Routes one client's data-channel messages for the life of the session.
///
/// The embedding application feeds raw lines through the returned sender
/// and supplies the display, clipboard, events and gamepad backends. Each
/// message is fully dispatched before the next is taken, so command
/// ordering is preserved.
pub struct InputSession {
    router: InputRouter,
    messages: mpsc::Receiver<String>,
    monitor: Option<ClipboardMonitor>,
}

impl InputSession {
    pub fn new(
        section: &SessionSection,
        display: Box<dyn DisplayInput>,
        clipboard: Arc<dyn ClipboardAccess>,
        events: Arc<dyn RouterEvents>,
        gamepads: Arc<dyn GamepadFactory>,
    ) -> (Self, mpsc::Sender<String>) {
        let policy = section.clipboard_policy();
        let config = RouterConfig {
            mouse_socket: section.mouse_socket.clone(),
            joystick_socket: section.joystick_socket.clone(),
            clipboard: policy,
        };
        let monitor = ClipboardMonitor::new(policy, Arc::clone(&clipboard), Arc::clone(&events));
        let router = InputRouter::new(config, display, clipboard, events, gamepads);

        let (tx, rx) = mpsc::channel(256);
        (
            Self {
                router,
                messages: rx,
                monitor: Some(monitor),
            },
            tx,
        )
    }

    /// Run until the message sender is dropped or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), DaemonError> {
        self.router.connect().await?;

        let monitor = self
            .monitor
            .take()
            .map(|m| tokio::spawn(m.run(shutdown.clone())));

        loop {
            tokio::select! {
                message = self.messages.recv() => {
                    match message {
                        Some(line) => self.router.handle_message(&line).await,
                        None => {
                            info!("data channel closed, ending session");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("session shut down");
                        break;
                    }
                }
            }
        }

        self.router.disconnect();
        if let Some(monitor) = monitor {
            monitor.abort();
        }
        Ok(())
    }
}
