//! Virtual device descriptors and capability templates.

use serde::{Deserialize, Serialize};

use crate::codes;

/// Kind of virtual input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Pointer,
    Gamepad,
}

impl DeviceKind {
    /// Prefix of the kernel device node this kind resolves under `/dev/input`.
    pub fn node_prefix(self) -> &'static str {
        match self {
            Self::Pointer => "event",
            Self::Gamepad => "js",
        }
    }
}

/// Range metadata for an absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsRange {
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
}

impl AbsRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            fuzz: 0,
            flat: 0,
        }
    }
}

/// One entry in a device's ordered capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub event_type: u16,
    pub code: u16,
    /// Present only for absolute axes.
    pub range: Option<AbsRange>,
}

impl Capability {
    pub const fn key(code: u16) -> Self {
        Self {
            event_type: codes::EV_KEY,
            code,
            range: None,
        }
    }

    pub const fn relative(code: u16) -> Self {
        Self {
            event_type: codes::EV_REL,
            code,
            range: None,
        }
    }

    pub const fn absolute(code: u16, range: AbsRange) -> Self {
        Self {
            event_type: codes::EV_ABS,
            code,
            range: Some(range),
        }
    }
}

/// Gamepad button template, in announcement order.
pub const GAMEPAD_BUTTONS: [u16; 11] = [
    codes::BTN_GAMEPAD,
    codes::BTN_EAST,
    codes::BTN_NORTH,
    codes::BTN_WEST,
    codes::BTN_TL,
    codes::BTN_TR,
    codes::BTN_SELECT,
    codes::BTN_START,
    codes::BTN_THUMBL,
    codes::BTN_THUMBR,
    codes::BTN_MODE,
];

/// Gamepad axis template, in announcement order.
pub const GAMEPAD_AXES: [(u16, AbsRange); 8] = [
    (codes::ABS_X, AbsRange::new(-32768, 32767)),
    (codes::ABS_Y, AbsRange::new(-32768, 32767)),
    (codes::ABS_RX, AbsRange::new(-32768, 32767)),
    (codes::ABS_RY, AbsRange::new(-32768, 32767)),
    (codes::ABS_Z, AbsRange::new(-32768, 32767)),
    (codes::ABS_RZ, AbsRange::new(-32768, 32767)),
    (codes::ABS_HAT0X, AbsRange::new(-1, 1)),
    (codes::ABS_HAT0Y, AbsRange::new(-1, 1)),
];

/// Full description of a virtual input device to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// Ordered capability set registered with the kernel at creation.
    pub capabilities: Vec<Capability>,
}

impl DeviceSpec {
    /// A virtual relative pointer: two axes, three buttons, a wheel.
    pub fn pointer(name: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::Pointer,
            name: name.into(),
            vendor: 0,
            product: 0,
            version: 0,
            capabilities: vec![
                Capability::relative(codes::REL_X),
                Capability::relative(codes::REL_Y),
                Capability::key(codes::BTN_LEFT),
                Capability::key(codes::BTN_MIDDLE),
                Capability::key(codes::BTN_RIGHT),
                Capability::relative(codes::REL_WHEEL),
            ],
        }
    }

    /// A virtual gamepad with the full button and axis templates.
    pub fn gamepad(name: impl Into<String>) -> Self {
        Self::gamepad_with(name, GAMEPAD_BUTTONS.len(), GAMEPAD_AXES.len())
    }

    /// A virtual gamepad with a capped-length prefix of the templates.
    ///
    /// `buttons` and `axes` are counts reported by the client; they are
    /// clamped to the template lengths, never extended beyond them.
    pub fn gamepad_with(name: impl Into<String>, buttons: usize, axes: usize) -> Self {
        let buttons = buttons.min(GAMEPAD_BUTTONS.len());
        let axes = axes.min(GAMEPAD_AXES.len());

        let mut capabilities: Vec<Capability> = GAMEPAD_BUTTONS[..buttons]
            .iter()
            .map(|&code| Capability::key(code))
            .collect();
        capabilities.extend(
            GAMEPAD_AXES[..axes]
                .iter()
                .map(|&(code, range)| Capability::absolute(code, range)),
        );

        Self {
            kind: DeviceKind::Gamepad,
            name: name.into(),
            vendor: 0x045e,
            product: 0x028e,
            version: 0x110,
            capabilities,
        }
    }
}

/// Kernel-assigned identity of a created virtual device.
///
/// Assigned once during creation (via registry snapshot diffing) and
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelIdentity {
    /// Event node name, e.g. `event7`.
    pub event_node: String,
    /// Parent input node name, e.g. `input12`.
    pub input_node: String,
}
