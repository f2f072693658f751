//! Codec errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("malformed envelope: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
