//! CONNECTION_CLOSE, both the transport (0x1c) and application (0x1d) forms
//! (RFC 9000 §19.19).

use crate::error::CodecResult;
use crate::varint::{decode_slice_with_varint_len, encode_slice_with_varint_len, VarInt};
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

pub const QUIC_ERROR_TAG: u8 = 0x1c;
pub const APPLICATION_ERROR_TAG: u8 = 0x1d;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectionClose<'a> {
    pub error_code: VarInt,
    /// `true` for the application-level (0x1d) form, which carries no frame
    /// type field. Kept as an explicit flag rather than inferred from
    /// `frame_type == 0`, since a transport close can legitimately cite
    /// frame type 0 (PADDING).
    pub is_application: bool,
    /// Only meaningful when `is_application` is `false`: the frame type
    /// that triggered the close, or `VarInt::ZERO` if unknown.
    pub frame_type: VarInt,
    pub reason_phrase: &'a [u8],
}

pub fn parse<'a>(tag: u8, buffer: DecoderBuffer<'a>) -> CodecResult<(ConnectionClose<'a>, DecoderBuffer<'a>)> {
    let (error_code, buffer) = VarInt::decode(buffer)?;
    let is_application = tag != QUIC_ERROR_TAG;
    let (frame_type, buffer) = if is_application {
        (VarInt::ZERO, buffer)
    } else {
        VarInt::decode(buffer)?
    };
    let (reason_phrase, buffer) = decode_slice_with_varint_len(buffer)?;

    Ok((
        ConnectionClose {
            error_code,
            is_application,
            frame_type,
            reason_phrase,
        },
        buffer,
    ))
}

/// Builds the transport-level (0x1c) form, which carries the triggering
/// frame type.
pub struct TransportClose<'a> {
    pub error_code: VarInt,
    pub frame_type: VarInt,
    pub reason_phrase: &'a [u8],
}

impl TransportClose<'_> {
    pub fn encoded_len(&self) -> usize {
        1 + self.error_code.encoding_size()
            + self.frame_type.encoding_size()
            + VarInt::try_from(self.reason_phrase.len() as u64)
                .expect("reason phrase fits a varint length")
                .encoding_size()
            + self.reason_phrase.len()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(QUIC_ERROR_TAG)?;
        self.error_code.encode(buffer)?;
        self.frame_type.encode(buffer)?;
        encode_slice_with_varint_len(buffer, self.reason_phrase)
    }
}

/// Builds the application-level (0x1d) form, which has no frame type field.
pub struct ApplicationClose<'a> {
    pub error_code: VarInt,
    pub reason_phrase: &'a [u8],
}

impl ApplicationClose<'_> {
    pub fn encoded_len(&self) -> usize {
        1 + self.error_code.encoding_size()
            + VarInt::try_from(self.reason_phrase.len() as u64)
                .expect("reason phrase fits a varint length")
                .encoding_size()
            + self.reason_phrase.len()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(APPLICATION_ERROR_TAG)?;
        self.error_code.encode(buffer)?;
        encode_slice_with_varint_len(buffer, self.reason_phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_transport_close() {
        let close = TransportClose {
            error_code: VarInt::try_from(0x0au64).unwrap(),
            frame_type: VarInt::try_from(0x08u64).unwrap(),
            reason_phrase: b"bad stream state",
        };
        let mut out = vec![0u8; close.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        close.encode(&mut buffer).unwrap();
        assert_eq!(out[0], QUIC_ERROR_TAG);

        let (parsed, rest) = parse(QUIC_ERROR_TAG, DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.error_code, close.error_code);
        assert_eq!(parsed.frame_type, close.frame_type);
        assert_eq!(parsed.reason_phrase, close.reason_phrase);
    }

    #[test]
    fn round_trips_application_close_with_no_frame_type() {
        let close = ApplicationClose {
            error_code: VarInt::try_from(1u64).unwrap(),
            reason_phrase: b"",
        };
        let mut out = vec![0u8; close.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        close.encode(&mut buffer).unwrap();
        assert_eq!(out[0], APPLICATION_ERROR_TAG);

        let (parsed, rest) = parse(APPLICATION_ERROR_TAG, DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert!(parsed.is_application);
        assert_eq!(parsed.frame_type, VarInt::ZERO);
        assert_eq!(parsed.error_code, close.error_code);
    }
}
