//! Per-device fan-out server.
//!
//! Each virtual device is served by exactly one `FanoutServer` listening on
//! the device's own Unix datagram socket. Inbound packets stream through
//! the envelope decoder; every decoded envelope is applied to the device's
//! emit primitive. A bad envelope or a failed emit is logged and dropped —
//! it never terminates the server or touches sibling devices.

use std::path::{Path, PathBuf};

use streamdesk_protocol::EnvelopeDecoder;
use streamdesk_types::CommandEnvelope;
use tokio::net::UnixDatagram;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::error::DeviceError;

/// One event to pass to a device's emit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

/// The emit primitive of a virtual device.
///
/// A slice of events forms one frame: the sink flushes a sync report after
/// the last event, so callers batch events that must land atomically.
pub trait EmitSink: Send {
    fn emit(&mut self, events: &[EmitEvent]) -> std::io::Result<()>;
}

impl EmitSink for evdev::uinput::VirtualDevice {
    fn emit(&mut self, events: &[EmitEvent]) -> std::io::Result<()> {
        let events: Vec<evdev::InputEvent> = events
            .iter()
            .map(|e| evdev::InputEvent::new(e.event_type, e.code, e.value))
            .collect();
        evdev::uinput::VirtualDevice::emit(self, &events)
    }
}

/// Fan-out server for one virtual device.
pub struct FanoutServer {
    socket: UnixDatagram,
    socket_path: PathBuf,
    sink: Box<dyn EmitSink>,
    decoder: EnvelopeDecoder,
    /// Events whose sync was suppressed, waiting for the frame to close.
    pending: Vec<EmitEvent>,
}

impl FanoutServer {
    /// Bind the device's endpoint. The socket file is removed again when
    /// the server is dropped, on every exit path.
    pub fn bind(socket_path: &Path, sink: Box<dyn EmitSink>) -> Result<Self, DeviceError> {
        let socket = UnixDatagram::bind(socket_path).map_err(|e| DeviceError::SocketBind {
            path: socket_path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            socket,
            socket_path: socket_path.to_path_buf(),
            sink,
            decoder: EnvelopeDecoder::new(),
            pending: Vec::new(),
        })
    }

    /// Serve until shutdown. `ready` fires once the server is receiving.
    ///
    /// Loss of the server's own socket is fatal for this device only; the
    /// error propagates and the device handle is released on return.
    pub async fn run(
        mut self,
        ready: oneshot::Sender<()>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), DeviceError> {
        debug!(socket = %self.socket_path.display(), "device socket serving");
        let _ = ready.send(());

        let mut buf = vec![0u8; 4096];
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
                received = self.socket.recv(&mut buf) => {
                    match received {
                        Ok(n) => self.handle_packet(&buf[..n]),
                        Err(e) => return Err(DeviceError::SocketLost(e)),
                    }
                }
            }
        }
    }

    fn handle_packet(&mut self, data: &[u8]) {
        self.decoder.feed(data);
        loop {
            match self.decoder.next_envelope() {
                Ok(Some(envelope)) => self.apply(envelope),
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        socket = %self.socket_path.display(),
                        error = %e,
                        "dropping malformed envelope"
                    );
                }
            }
        }
    }

    fn apply(&mut self, envelope: CommandEnvelope) {
        let ((event_type, code), value) = envelope.args;
        self.pending.push(EmitEvent {
            event_type,
            code,
            value,
        });

        if !envelope.kwargs.syn {
            // Frame stays open until a syncing envelope arrives.
            return;
        }

        let frame = std::mem::take(&mut self.pending);
        if let Err(e) = self.sink.emit(&frame) {
            warn!(
                socket = %self.socket_path.display(),
                error = %e,
                "failed to emit input event"
            );
        }
    }
}

impl Drop for FanoutServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
