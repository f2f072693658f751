//! Watchdog error types.

use thiserror::Error;

/// Errors from the activity watchdog and its event tap.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("no input devices found to watch")]
    NoDevices,

    #[error("input event source lost")]
    SourceLost(#[source] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
