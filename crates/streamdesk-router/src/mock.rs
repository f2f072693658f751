//! Mock router backends for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::clipboard::ClipboardAccess;
use crate::display::{DisplayInput, PointerButton};
use crate::error::RouterError;
use crate::events::RouterEvents;
use crate::gamepad::{GamepadDevice, GamepadFactory};

// ---------------------------------------------------------------------------
// MockDisplay
// ---------------------------------------------------------------------------

/// One recorded display injection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Key { keysym: u32, down: bool },
    Position { x: i32, y: i32 },
    Motion { dx: i32, dy: i32 },
    Button { button: PointerButton, down: bool },
    Scroll { up: bool },
    Sync,
}

/// Display backend that records every call.
pub struct MockDisplay {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDisplay {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a clonable handle for observing recorded calls from tests.
    pub fn handle(&self) -> MockDisplayHandle {
        MockDisplayHandle {
            calls: Arc::clone(&self.calls),
        }
    }
}

/// Clonable observer handle for [`MockDisplay`].
#[derive(Clone)]
pub struct MockDisplayHandle {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl MockDisplayHandle {
    pub fn calls(&self) -> Vec<DisplayCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DisplayInput for MockDisplay {
    async fn key(&mut self, keysym: u32, down: bool) -> Result<(), RouterError> {
        self.calls
            .lock()
            .unwrap()
            .push(DisplayCall::Key { keysym, down });
        Ok(())
    }

    async fn pointer_position(&mut self, x: i32, y: i32) -> Result<(), RouterError> {
        self.calls.lock().unwrap().push(DisplayCall::Position { x, y });
        Ok(())
    }

    async fn pointer_motion(&mut self, dx: i32, dy: i32) -> Result<(), RouterError> {
        self.calls.lock().unwrap().push(DisplayCall::Motion { dx, dy });
        Ok(())
    }

    async fn button(&mut self, button: PointerButton, down: bool) -> Result<(), RouterError> {
        self.calls
            .lock()
            .unwrap()
            .push(DisplayCall::Button { button, down });
        Ok(())
    }

    async fn scroll(&mut self, up: bool) -> Result<(), RouterError> {
        self.calls.lock().unwrap().push(DisplayCall::Scroll { up });
        Ok(())
    }

    async fn sync(&mut self) -> Result<(), RouterError> {
        self.calls.lock().unwrap().push(DisplayCall::Sync);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockClipboard
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockClipboardState {
    content: String,
    written: Vec<String>,
}

/// Clipboard provider backed by an in-memory string.
#[derive(Default)]
pub struct MockClipboard {
    state: Mutex<MockClipboardState>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content the next read returns.
    pub fn set_content(&self, text: &str) {
        self.state.lock().unwrap().content = text.to_string();
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }
}

#[async_trait]
impl ClipboardAccess for MockClipboard {
    async fn read(&self) -> Result<String, RouterError> {
        Ok(self.state.lock().unwrap().content.clone())
    }

    async fn write(&self, text: &str) -> Result<(), RouterError> {
        let mut state = self.state.lock().unwrap();
        state.content = text.to_string();
        state.written.push(text.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingEvents
// ---------------------------------------------------------------------------

/// One recorded router callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCall {
    VideoBitrate(u32),
    AudioBitrate(u32),
    PointerVisible(bool),
    ClipboardRead(String),
    Resize(String),
    SetFps(u32),
    SetEnableAudio(bool),
    ClientFps(u32),
    ClientLatency(u32),
}

/// Events sink that records every callback.
#[derive(Default)]
pub struct RecordingEvents {
    calls: Mutex<Vec<EventCall>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EventCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RouterEvents for RecordingEvents {
    fn on_video_bitrate(&self, bps: u32) {
        self.calls.lock().unwrap().push(EventCall::VideoBitrate(bps));
    }

    fn on_audio_bitrate(&self, bps: u32) {
        self.calls.lock().unwrap().push(EventCall::AudioBitrate(bps));
    }

    fn on_pointer_visible(&self, visible: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(EventCall::PointerVisible(visible));
    }

    fn on_clipboard_read(&self, text: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(EventCall::ClipboardRead(text.to_string()));
    }

    fn on_resize(&self, resolution: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(EventCall::Resize(resolution.to_string()));
    }

    fn on_set_fps(&self, fps: u32) {
        self.calls.lock().unwrap().push(EventCall::SetFps(fps));
    }

    fn on_set_enable_audio(&self, enabled: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(EventCall::SetEnableAudio(enabled));
    }

    fn on_client_fps(&self, fps: u32) {
        self.calls.lock().unwrap().push(EventCall::ClientFps(fps));
    }

    fn on_client_latency(&self, ms: u32) {
        self.calls.lock().unwrap().push(EventCall::ClientLatency(ms));
    }
}

// ---------------------------------------------------------------------------
// MockGamepadFactory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockGamepadState {
    connects: Vec<(usize, usize)>,
    emitted: Vec<(u16, u16, i32)>,
}

/// Gamepad factory whose devices record emits into shared state.
#[derive(Default)]
pub struct MockGamepadFactory {
    state: Arc<Mutex<MockGamepadState>>,
}

impl MockGamepadFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `(axes, buttons)` pairs of every connect call.
    pub fn connects(&self) -> Vec<(usize, usize)> {
        self.state.lock().unwrap().connects.clone()
    }

    /// Every `(event type, code, value)` emitted by a created gamepad.
    pub fn emitted(&self) -> Vec<(u16, u16, i32)> {
        self.state.lock().unwrap().emitted.clone()
    }
}

struct MockGamepad {
    state: Arc<Mutex<MockGamepadState>>,
}

impl GamepadDevice for MockGamepad {
    fn emit(&mut self, event_type: u16, code: u16, value: i32) -> Result<(), RouterError> {
        self.state
            .lock()
            .unwrap()
            .emitted
            .push((event_type, code, value));
        Ok(())
    }
}

#[async_trait]
impl GamepadFactory for MockGamepadFactory {
    async fn connect(
        &self,
        axes: usize,
        buttons: usize,
    ) -> Result<Box<dyn GamepadDevice>, RouterError> {
        self.state.lock().unwrap().connects.push((axes, buttons));
        Ok(Box::new(MockGamepad {
            state: Arc::clone(&self.state),
        }))
    }
}
