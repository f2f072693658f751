//! The device-emission command envelope.
//!
//! Every message on a device socket decodes to a [`CommandEnvelope`]: the
//! positional arguments of one emit call plus a map of named flags. The
//! fan-out server forwards these to the device's emit primitive verbatim;
//! it does not interpret argument semantics beyond what the emit call
//! needs.

use serde::{Deserialize, Serialize};

/// Positional emit arguments: an `(event type, code)` pair and a value.
pub type EmitArgs = ((u16, u16), i32);

/// One device-emission command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub args: EmitArgs,
    #[serde(default)]
    pub kwargs: EmitFlags,
}

impl CommandEnvelope {
    /// An envelope that syncs immediately after the event.
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            args: ((event_type, code), value),
            kwargs: EmitFlags::default(),
        }
    }

    /// An envelope whose sync report is withheld until the next syncing
    /// emit, so a following event lands in the same frame.
    pub fn without_sync(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            args: ((event_type, code), value),
            kwargs: EmitFlags { syn: false },
        }
    }
}

/// Named arguments of an emit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitFlags {
    /// Whether to flush a sync report after this event. Defaults to true;
    /// senders omit the flag entirely for ordinary events.
    #[serde(default = "default_syn")]
    pub syn: bool,
}

impl Default for EmitFlags {
    fn default() -> Self {
        Self { syn: true }
    }
}

fn default_syn() -> bool {
    true
}
