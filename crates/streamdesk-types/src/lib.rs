//! Shared types for streamdesk.
//!
//! This crate contains the types shared across the streamdesk workspace:
//! the device-emission command envelope, virtual device descriptors and
//! capability templates, the client-facing text command grammar, and the
//! clipboard direction policy.

pub mod clipboard;
pub mod codes;
pub mod command;
pub mod device;
pub mod envelope;

pub use clipboard::ClipboardPolicy;
pub use command::{Command, CommandError, JoystickCommand};
pub use device::{AbsRange, Capability, DeviceKind, DeviceSpec, KernelIdentity};
pub use envelope::{CommandEnvelope, EmitFlags};
