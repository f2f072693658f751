//! Daemon errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("device error: {0}")]
    Device(#[from] streamdesk_uinput::DeviceError),

    #[error("router error: {0}")]
    Router(#[from] streamdesk_router::RouterError),

    #[error("watchdog error: {0}")]
    Watchdog(#[from] streamdesk_watchdog::WatchdogError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
