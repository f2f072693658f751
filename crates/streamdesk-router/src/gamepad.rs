//! Local virtual gamepad seam.
//!
//! When no joystick socket is configured, `js,c` builds a gamepad through
//! this factory instead of proxying envelopes to a fleet device. The
//! daemon supplies a uinput-backed implementation.

use async_trait::async_trait;

use crate::error::RouterError;

/// A connected virtual gamepad.
pub trait GamepadDevice: Send + 'static {
    /// Emit one raw event and sync.
    fn emit(&mut self, event_type: u16, code: u16, value: i32) -> Result<(), RouterError>;
}

/// Builds virtual gamepads on demand.
#[async_trait]
pub trait GamepadFactory: Send + Sync + 'static {
    /// Create a gamepad carrying up to `axes` axes and `buttons` buttons.
    async fn connect(
        &self,
        axes: usize,
        buttons: usize,
    ) -> Result<Box<dyn GamepadDevice>, RouterError>;
}
