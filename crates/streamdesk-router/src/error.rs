//! Router error types.

use streamdesk_types::CommandError;
use thiserror::Error;

/// Errors from dispatching data-channel commands.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("display injection failed: {0}")]
    Display(#[source] anyhow::Error),

    #[error("clipboard access failed: {0}")]
    Clipboard(#[source] anyhow::Error),

    #[error("clipboard payload is not valid base64 text")]
    ClipboardPayload,

    #[error("device socket {path} unavailable")]
    Socket {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("envelope encoding failed")]
    Encode(#[from] streamdesk_protocol::CodecError),

    #[error("gamepad backend failed: {0}")]
    Gamepad(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
