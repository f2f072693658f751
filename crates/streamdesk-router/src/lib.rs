//! Data-channel command routing for streamdesk.
//!
//! The [`InputRouter`] parses the client's `verb,arg,...` text protocol
//! and dispatches each command: keysym and absolute pointer actions to a
//! [`DisplayInput`] backend, relative pointer and gamepad traffic to the
//! virtual device sockets (or a local [`GamepadFactory`]), and
//! pipeline-facing commands to a registered [`RouterEvents`] sink.

pub mod clipboard;
pub mod display;
pub mod error;
pub mod events;
pub mod gamepad;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod router;

pub use clipboard::{ClipboardAccess, ClipboardMonitor};
pub use display::{DisplayInput, PointerButton};
pub use error::RouterError;
pub use events::{NullEvents, RouterEvents};
pub use gamepad::{GamepadDevice, GamepadFactory};
pub use router::{clamp_resolution, InputRouter, RouterConfig};
