//! Uinput-backed gamepad factory for session-local joysticks.

use async_trait::async_trait;
use streamdesk_router::{GamepadDevice, GamepadFactory, RouterError};
use streamdesk_types::DeviceSpec;
use streamdesk_uinput::{build_device, EmitEvent, EmitSink};
use tracing::info;

/// Builds throwaway uinput gamepads, one per `js,c` command.
///
/// The created devices never get a fan-out socket or registry entry;
/// they live exactly as long as the session's joystick connection.
pub struct UinputGamepadFactory {
    name: String,
}

impl UinputGamepadFactory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

struct UinputGamepad {
    sink: Box<dyn EmitSink>,
}

impl GamepadDevice for UinputGamepad {
    fn emit(&mut self, event_type: u16, code: u16, value: i32) -> Result<(), RouterError> {
        self.sink
            .emit(&[EmitEvent {
                event_type,
                code,
                value,
            }])
            .map_err(|e| RouterError::Gamepad(e.into()))
    }
}

#[async_trait]
impl GamepadFactory for UinputGamepadFactory {
    async fn connect(
        &self,
        axes: usize,
        buttons: usize,
    ) -> Result<Box<dyn GamepadDevice>, RouterError> {
        info!(name = %self.name, buttons, axes, "creating session gamepad");
        let spec = DeviceSpec::gamepad_with(&self.name, buttons, axes);
        let device = build_device(&spec).map_err(|e| RouterError::Gamepad(e.into()))?;
        Ok(Box::new(UinputGamepad {
            sink: Box::new(device),
        }))
    }
}
