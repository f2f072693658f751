//! Virtual input device fleet for streamdesk.
//!
//! Creates uinput pointer and gamepad devices, discovers their
//! kernel-assigned identities by diffing sysfs registry snapshots, and
//! serves each device behind its own Unix datagram socket so unprivileged
//! clients can inject events into a specific device without holding the
//! device handle.

pub mod device;
pub mod error;
pub mod fleet;
pub mod registry;
pub mod server;

pub use device::{build_device, create_device, wait_for_devnode, CreatedDevice};
pub use error::DeviceError;
pub use fleet::{cleanup, DeviceFleet, FleetConfig};
pub use registry::{diff, InputRegistry, RegistryDiff, Snapshot, SysfsRegistry};
pub use server::{EmitEvent, EmitSink, FanoutServer};
