//! Wire codec for streamdesk device sockets.
//!
//! Device-emission commands travel as self-describing msgpack maps so that
//! clients in any language can address a device socket without sharing Rust
//! type definitions. The decoder is streaming: it persists across packets,
//! buffers partial frames, and splits concatenated frames.

pub mod error;
pub mod wire;

pub use error::CodecError;
pub use wire::{encode_envelope, EnvelopeDecoder};
