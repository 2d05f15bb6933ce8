//! Retry packets and the pseudo-packet construction used to compute their
//! integrity tag (RFC 9000 §17.2.5, RFC 9001 §5.8). The tag itself is an
//! AEAD output produced by an external cipher; this module only builds the
//! bytes the cipher authenticates over.

use super::long::{parse_prefix, LongPacketType};
use crate::error::{CodecError, CodecResult, TransportError, FRAME_ENCODING_ERROR};
use qcodec_buffer::EncoderBuffer;

pub const INTEGRITY_TAG_LEN: usize = 16;

#[derive(Clone, Copy, Debug)]
pub struct Retry<'a> {
    pub version: u32,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    pub retry_token: &'a [u8],
    pub retry_integrity_tag: &'a [u8; INTEGRITY_TAG_LEN],
}

pub fn parse_retry<'a>(datagram: &'a [u8]) -> CodecResult<Retry<'a>> {
    let (prefix, buffer) = parse_prefix(datagram)?;
    if prefix.version == 0 || prefix.packet_type() != LongPacketType::Retry {
        return Err(CodecError::Declined);
    }

    let remaining = buffer.into_less_safe_slice();
    if remaining.len() < INTEGRITY_TAG_LEN {
        return Err(TransportError::new(
            FRAME_ENCODING_ERROR,
            "retry packet shorter than its integrity tag",
        )
        .into());
    }

    let (token, tag) = remaining.split_at(remaining.len() - INTEGRITY_TAG_LEN);
    let tag: &[u8; INTEGRITY_TAG_LEN] = tag.try_into().expect("split at fixed tag length");

    Ok(Retry {
        version: prefix.version,
        destination_connection_id: prefix.destination_connection_id,
        source_connection_id: prefix.source_connection_id,
        retry_token: token,
        retry_integrity_tag: tag,
    })
}

/// The fields of a Retry packet's header and token, i.e. everything except
/// the integrity tag — both the wire form a server sends and the input to
/// the pseudo-packet construction below.
pub struct RetryFields<'a> {
    pub version: u32,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    pub retry_token: &'a [u8],
}

impl<'a> RetryFields<'a> {
    fn header_and_token_len(&self) -> usize {
        1 + 4
            + 1
            + self.destination_connection_id.len()
            + 1
            + self.source_connection_id.len()
            + self.retry_token.len()
    }

    fn write_header_and_token(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), qcodec_buffer::EncoderError> {
        let tag = super::LONG_HEADER_BIT | super::FIXED_BIT | (LongPacketType::Retry.into_bits() << 4);
        buffer.write_u8(tag)?;
        buffer.write_u32(self.version)?;
        buffer.write_u8(self.destination_connection_id.len() as u8)?;
        buffer.write_slice(self.destination_connection_id)?;
        buffer.write_u8(self.source_connection_id.len() as u8)?;
        buffer.write_slice(self.source_connection_id)?;
        buffer.write_slice(self.retry_token)
    }

    /// Size of the real wire packet, tag included.
    pub fn encoded_len(&self) -> usize {
        self.header_and_token_len() + INTEGRITY_TAG_LEN
    }

    /// Writes the real Retry packet, given the integrity tag computed by
    /// the AEAD collaborator over [`pseudo_packet_len`]/[`write_pseudo_packet`].
    pub fn encode(
        &self,
        integrity_tag: &[u8; INTEGRITY_TAG_LEN],
        buffer: &mut EncoderBuffer<'_>,
    ) -> Result<(), qcodec_buffer::EncoderError> {
        self.write_header_and_token(buffer)?;
        buffer.write_slice(integrity_tag)
    }
}

/// Size of the pseudo-packet (`create_retry_itag` input) for the given
/// original destination connection ID and retry fields.
pub fn pseudo_packet_len(original_destination_connection_id: &[u8], retry: &RetryFields<'_>) -> usize {
    1 + original_destination_connection_id.len() + retry.header_and_token_len()
}

/// Builds the bytes a Retry integrity tag is computed over:
/// `odcid_len | odcid | flags | version | dcid_len | dcid | scid_len | scid | token`.
pub fn write_pseudo_packet(
    original_destination_connection_id: &[u8],
    retry: &RetryFields<'_>,
    buffer: &mut EncoderBuffer<'_>,
) -> Result<(), qcodec_buffer::EncoderError> {
    buffer.write_u8(original_destination_connection_id.len() as u8)?;
    buffer.write_slice(original_destination_connection_id)?;
    retry.write_header_and_token(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_retry_and_pseudo_packet() {
        let odcid = [0xaa; 8];
        let fields = RetryFields {
            version: 1,
            destination_connection_id: &[1, 2, 3, 4, 5, 6, 7, 8],
            source_connection_id: &[9, 9],
            retry_token: b"opaque-retry-token",
        };
        let tag = [0x42u8; INTEGRITY_TAG_LEN];

        let mut wire = vec![0u8; fields.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut wire);
        fields.encode(&tag, &mut buffer).unwrap();

        let parsed = parse_retry(&wire).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.retry_token, b"opaque-retry-token");
        assert_eq!(parsed.retry_integrity_tag, &tag);

        let mut pseudo = vec![0u8; pseudo_packet_len(&odcid, &fields)];
        let mut pseudo_buffer = EncoderBuffer::new(&mut pseudo);
        write_pseudo_packet(&odcid, &fields, &mut pseudo_buffer).unwrap();
        assert_eq!(pseudo[0], 8);
        assert_eq!(&pseudo[1..9], &odcid);
        assert_eq!(&pseudo[9..], &wire[..wire.len() - INTEGRITY_TAG_LEN]);
    }

    #[test]
    fn rejects_retry_shorter_than_tag() {
        let mut wire = vec![0xf0u8];
        wire.extend_from_slice(&1u32.to_be_bytes());
        wire.push(0); // dcid_len
        wire.push(0); // scid_len
        wire.extend_from_slice(&[0u8; 4]); // too short for a 16-byte tag
        assert!(parse_retry(&wire).is_err());
    }
}
