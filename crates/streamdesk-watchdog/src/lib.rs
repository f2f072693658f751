//! Session activity watchdog for streamdesk.
//!
//! A [`Watchdog`] polls the time since the last input event and raises
//! [`WatchdogEvents`] callbacks when the session goes idle or expires.
//! The [`tap`] module feeds it from the host's evdev devices; any other
//! event source can stroke the shared [`StrokeHandle`] instead.

pub mod error;
pub mod monitor;
pub mod tap;

pub use error::WatchdogError;
pub use monitor::{
    Clock, MonitorState, MonotonicClock, StrokeHandle, Transition, Watchdog, WatchdogEvents,
};
