//! Connection ID lifecycle frames (RFC 9000 §19.15, §19.16): NEW_CONNECTION_ID,
//! RETIRE_CONNECTION_ID.

use crate::error::{CodecError, CodecResult, TransportError, FRAME_ENCODING_ERROR};
use crate::packet::validate_connection_id_len;
use crate::varint::VarInt;
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

pub const NEW_CONNECTION_ID_TAG: u8 = 0x18;
pub const RETIRE_CONNECTION_ID_TAG: u8 = 0x19;

pub const STATELESS_RESET_TOKEN_LEN: usize = 16;

#[derive(Clone, Copy, Debug)]
pub struct NewConnectionId<'a> {
    pub sequence_number: VarInt,
    pub retire_prior_to: VarInt,
    pub connection_id: &'a [u8],
    pub stateless_reset_token: &'a [u8; STATELESS_RESET_TOKEN_LEN],
}

/// Parses a NEW_CONNECTION_ID frame, enforcing the two invariants RFC 9000
/// §19.15 calls out explicitly: `retire_prior_to <= sequence_number`, and a
/// connection ID length of `1..=20` bytes.
pub fn parse_new_connection_id<'a>(
    buffer: DecoderBuffer<'a>,
) -> CodecResult<(NewConnectionId<'a>, DecoderBuffer<'a>)> {
    let (sequence_number, buffer) = VarInt::decode(buffer)?;
    let (retire_prior_to, buffer) = VarInt::decode(buffer)?;
    if retire_prior_to.as_u64() > sequence_number.as_u64() {
        return Err(TransportError::new(
            FRAME_ENCODING_ERROR,
            "retire_prior_to exceeds sequence_number",
        )
        .with_frame_type(VarInt::from(NEW_CONNECTION_ID_TAG))
        .into());
    }

    let (length, buffer) = buffer.decode_u8()?;
    if length == 0 {
        return Err(TransportError::new(FRAME_ENCODING_ERROR, "connection id length is zero")
            .with_frame_type(VarInt::from(NEW_CONNECTION_ID_TAG))
            .into());
    }
    validate_connection_id_len(length as usize)?;

    let (connection_id, buffer) = buffer.decode_slice(length as usize)?;
    let (token, buffer) = buffer.decode_slice(STATELESS_RESET_TOKEN_LEN)?;
    let token: &[u8; STATELESS_RESET_TOKEN_LEN] = token
        .into_less_safe_slice()
        .try_into()
        .expect("decode_slice returned exactly STATELESS_RESET_TOKEN_LEN bytes");

    Ok((
        NewConnectionId {
            sequence_number,
            retire_prior_to,
            connection_id: connection_id.into_less_safe_slice(),
            stateless_reset_token: token,
        },
        buffer,
    ))
}

impl NewConnectionId<'_> {
    pub fn encoded_len(&self) -> usize {
        1 + self.sequence_number.encoding_size()
            + self.retire_prior_to.encoding_size()
            + 1
            + self.connection_id.len()
            + STATELESS_RESET_TOKEN_LEN
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(NEW_CONNECTION_ID_TAG)?;
        self.sequence_number.encode(buffer)?;
        self.retire_prior_to.encode(buffer)?;
        buffer.write_u8(self.connection_id.len() as u8)?;
        buffer.write_slice(self.connection_id)?;
        buffer.write_slice(self.stateless_reset_token)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetireConnectionId {
    pub sequence_number: VarInt,
}

pub fn parse_retire_connection_id(
    buffer: DecoderBuffer<'_>,
) -> CodecResult<(RetireConnectionId, DecoderBuffer<'_>)> {
    let (sequence_number, buffer) = VarInt::decode(buffer)?;
    Ok((RetireConnectionId { sequence_number }, buffer))
}

impl RetireConnectionId {
    pub fn encoded_len(&self) -> usize {
        1 + self.sequence_number.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(RETIRE_CONNECTION_ID_TAG)?;
        self.sequence_number.encode(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_connection_id_wire(sequence_number: u64, retire_prior_to: u64) -> Vec<u8> {
        let frame = NewConnectionId {
            sequence_number: VarInt::try_from(sequence_number).unwrap(),
            retire_prior_to: VarInt::try_from(retire_prior_to).unwrap(),
            connection_id: &[1, 2, 3, 4],
            stateless_reset_token: &[0xab; STATELESS_RESET_TOKEN_LEN],
        };
        let mut out = vec![0u8; frame.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        frame.encode(&mut buffer).unwrap();
        out
    }

    #[test]
    fn parses_s5_new_connection_id() {
        let wire = new_connection_id_wire(2, 1);
        let (frame, rest) = parse_new_connection_id(DecoderBuffer::new(&wire[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(frame.sequence_number.as_u64(), 2);
        assert_eq!(frame.retire_prior_to.as_u64(), 1);
        assert_eq!(frame.connection_id, &[1, 2, 3, 4]);
        assert_eq!(frame.stateless_reset_token, &[0xab; STATELESS_RESET_TOKEN_LEN]);
    }

    #[test]
    fn rejects_retire_prior_to_above_sequence_number() {
        let wire = new_connection_id_wire(1, 2);
        assert!(matches!(
            parse_new_connection_id(DecoderBuffer::new(&wire[1..])),
            Err(CodecError::Error(_))
        ));
    }

    #[test]
    fn round_trips_retire_connection_id() {
        let frame = RetireConnectionId {
            sequence_number: VarInt::try_from(7u64).unwrap(),
        };
        let mut out = vec![0u8; frame.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        frame.encode(&mut buffer).unwrap();
        let (parsed, rest) = parse_retire_connection_id(DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, frame);
    }
}
