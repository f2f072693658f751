//! Orchestration for the streamdesk input sidecar.
//!
//! Wires the device fleet, activity watchdog and client sessions
//! together from a single TOML configuration. The fleet and watchdog
//! run as standalone daemons; [`InputSession`] is embedded by the
//! streaming application that owns the client data channel.

pub mod config;
pub mod daemon;
pub mod error;
pub mod gamepad;
pub mod session;
pub mod setup;

pub use config::Config;
pub use daemon::{run_fleet, run_watchdog};
pub use error::DaemonError;
pub use gamepad::UinputGamepadFactory;
pub use session::InputSession;
