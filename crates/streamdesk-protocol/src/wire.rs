//! Wire format: msgpack-encoded command envelopes.
//!
//! Each envelope is a map `{"args": [[type, code], value], "kwargs": {..}}`.
//! Messages carry no length prefix; the decoder recognises frame boundaries
//! from the msgpack structure itself, so several frames concatenated into
//! one packet decode as separate envelopes and a frame split across packets
//! is buffered until complete.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use streamdesk_types::CommandEnvelope;

use crate::error::CodecError;

/// Encode one envelope as a msgpack map.
pub fn encode_envelope(envelope: &CommandEnvelope) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    envelope.serialize(&mut rmp_serde::Serializer::new(&mut buf).with_struct_map())?;
    Ok(buf)
}

/// Streaming envelope decoder.
///
/// One decoder instance lives for the lifetime of a socket. Feed it raw
/// packet bytes and drain decoded envelopes with [`next_envelope`].
///
/// [`next_envelope`]: EnvelopeDecoder::next_envelope
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    buf: Vec<u8>,
}

impl EnvelopeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the socket.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Decode the next complete envelope, if any.
    ///
    /// Returns `Ok(None)` when the buffer holds no complete frame yet. A
    /// malformed frame yields `Err` and discards the buffered bytes, so one
    /// bad message never wedges the stream for subsequent packets.
    pub fn next_envelope(&mut self) -> Result<Option<CommandEnvelope>, CodecError> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut de = rmp_serde::Deserializer::new(Cursor::new(self.buf.as_slice()));
        match CommandEnvelope::deserialize(&mut de) {
            Ok(envelope) => {
                let consumed = usize::try_from(de.position()).unwrap_or(self.buf.len());
                self.buf.drain(..consumed);
                Ok(Some(envelope))
            }
            Err(e) if is_incomplete(&e) => Ok(None),
            Err(e) => {
                self.buf.clear();
                Err(e.into())
            }
        }
    }
}

/// Whether a decode error means "not enough bytes yet" rather than
/// "malformed frame".
fn is_incomplete(err: &rmp_serde::decode::Error) -> bool {
    use rmp_serde::decode::Error;
    match err {
        Error::InvalidMarkerRead(io) | Error::InvalidDataRead(io) => {
            io.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamdesk_types::codes;

    #[test]
    fn encode_decode_roundtrip() {
        let envelope = CommandEnvelope::without_sync(codes::EV_REL, codes::REL_X, -12);
        let bytes = encode_envelope(&envelope).unwrap();

        let mut decoder = EnvelopeDecoder::new();
        decoder.feed(&bytes);
        assert_eq!(decoder.next_envelope().unwrap(), Some(envelope));
        assert_eq!(decoder.next_envelope().unwrap(), None);
    }

    #[test]
    fn concatenated_frames_decode_separately() {
        let first = CommandEnvelope::without_sync(codes::EV_REL, codes::REL_X, 3);
        let second = CommandEnvelope::new(codes::EV_REL, codes::REL_Y, -4);

        let mut packet = encode_envelope(&first).unwrap();
        packet.extend(encode_envelope(&second).unwrap());

        let mut decoder = EnvelopeDecoder::new();
        decoder.feed(&packet);
        assert_eq!(decoder.next_envelope().unwrap(), Some(first));
        assert_eq!(decoder.next_envelope().unwrap(), Some(second));
        assert_eq!(decoder.next_envelope().unwrap(), None);
    }

    #[test]
    fn partial_frame_is_buffered_across_feeds() {
        let envelope = CommandEnvelope::new(codes::EV_KEY, codes::BTN_LEFT, 1);
        let bytes = encode_envelope(&envelope).unwrap();
        let split = bytes.len() / 2;

        let mut decoder = EnvelopeDecoder::new();
        decoder.feed(&bytes[..split]);
        assert_eq!(decoder.next_envelope().unwrap(), None);

        decoder.feed(&bytes[split..]);
        assert_eq!(decoder.next_envelope().unwrap(), Some(envelope));
    }

    #[test]
    fn malformed_frame_does_not_wedge_the_stream() {
        let mut decoder = EnvelopeDecoder::new();

        // A msgpack string where a map is expected.
        decoder.feed(&[0xa3, b'b', b'a', b'd']);
        assert!(decoder.next_envelope().is_err());

        // The next valid packet still decodes.
        let envelope = CommandEnvelope::new(codes::EV_REL, codes::REL_WHEEL, 1);
        decoder.feed(&encode_envelope(&envelope).unwrap());
        assert_eq!(decoder.next_envelope().unwrap(), Some(envelope));
    }

    #[test]
    fn decodes_foreign_map_without_kwargs() {
        // {"args": [[2, 0], 5]} hand-packed, the shape clients send when
        // they omit named arguments entirely.
        let bytes = [
            0x81, // map, 1 entry
            0xa4, b'a', b'r', b'g', b's', // "args"
            0x92, // array, 2 entries
            0x92, 0x02, 0x00, // [2, 0]
            0x05, // 5
        ];

        let mut decoder = EnvelopeDecoder::new();
        decoder.feed(&bytes);
        let envelope = decoder.next_envelope().unwrap().unwrap();
        assert_eq!(envelope.args, ((2, 0), 5));
        assert!(envelope.kwargs.syn);
    }
}
