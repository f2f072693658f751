//! Device fleet errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to scan input registry: {0}")]
    Scan(#[source] std::io::Error),

    #[error("failed to create uinput device: {0}")]
    Create(#[source] std::io::Error),

    /// Registry diffing after a creation must recover exactly one new
    /// kernel node; anything else means the device's identity is
    /// ambiguous and the device is not registered.
    #[error("expected exactly 1 new kernel input node after creation, found {0}")]
    AmbiguousCreation(usize),

    #[error("failed to bind device socket at {path}: {source}")]
    SocketBind {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("device socket lost: {0}")]
    SocketLost(#[source] std::io::Error),

    #[error("device setup cancelled by shutdown")]
    Cancelled,

    #[error("failed to install symlink {link}: {source}")]
    Symlink {
        link: PathBuf,
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
