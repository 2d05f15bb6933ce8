//! Version Negotiation packets (RFC 9000 §17.2.1). Distinguished from every
//! other long-header form purely by `version == 0`; the router layer
//! recognizes this case before dispatching into [`super::long`].

use super::{validate_connection_id_len, header_form, HeaderForm};
use crate::error::{CodecError, CodecResult, TransportError, FRAME_ENCODING_ERROR};
use qcodec_buffer::{DecoderBuffer, EncoderBuffer};

pub const VERSION: u32 = 0x0000_0000;

#[derive(Clone, Copy, Debug)]
pub struct VersionNegotiation<'a> {
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    /// Raw bytes of the supported-version list; length is a multiple of 4.
    supported_versions: &'a [u8],
}

impl<'a> VersionNegotiation<'a> {
    #[inline]
    pub fn supported_versions(&self) -> impl Iterator<Item = u32> + 'a {
        let bytes = self.supported_versions;
        (0..bytes.len() / 4).map(move |i| {
            let chunk = &bytes[i * 4..i * 4 + 4];
            u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        })
    }
}

/// Parses a Version Negotiation packet. Per RFC 9000 §17.2.1 the server may
/// set the non-form bits of byte 0 to any value, so unlike every other long
/// header form this does not require the fixed bit to be set.
pub fn parse_version_negotiation<'a>(datagram: &'a [u8]) -> CodecResult<VersionNegotiation<'a>> {
    let first = datagram.first().copied().ok_or(CodecError::Declined)?;
    if header_form(first) != HeaderForm::Long {
        return Err(CodecError::Declined);
    }

    let buffer = DecoderBuffer::new(datagram).skip(1)?;
    let (version, buffer) = buffer.decode_u32()?;
    if version != VERSION {
        return Err(CodecError::Declined);
    }

    let (dcid, buffer) = buffer.decode_slice_with_u8_len_prefix()?;
    let (scid, buffer) = buffer.decode_slice_with_u8_len_prefix()?;
    let destination_connection_id = dcid.into_less_safe_slice();
    let source_connection_id = scid.into_less_safe_slice();
    validate_connection_id_len(destination_connection_id.len())?;
    validate_connection_id_len(source_connection_id.len())?;

    let supported_versions = buffer.into_less_safe_slice();
    if supported_versions.is_empty() || supported_versions.len() % 4 != 0 {
        return Err(TransportError::new(
            FRAME_ENCODING_ERROR,
            "supported versions list is empty or not a multiple of 4 bytes",
        )
        .into());
    }

    Ok(VersionNegotiation {
        destination_connection_id,
        source_connection_id,
        supported_versions,
    })
}

pub fn encoded_len(destination_connection_id: &[u8], source_connection_id: &[u8], versions: &[u32]) -> usize {
    1 + 4 + 1 + destination_connection_id.len() + 1 + source_connection_id.len() + versions.len() * 4
}

pub fn encode(
    destination_connection_id: &[u8],
    source_connection_id: &[u8],
    versions: &[u32],
    buffer: &mut EncoderBuffer<'_>,
) -> Result<(), qcodec_buffer::EncoderError> {
    buffer.write_u8(super::LONG_HEADER_BIT | super::FIXED_BIT)?;
    buffer.write_u32(VERSION)?;
    buffer.write_u8(destination_connection_id.len() as u8)?;
    buffer.write_slice(destination_connection_id)?;
    buffer.write_u8(source_connection_id.len() as u8)?;
    buffer.write_slice(source_connection_id)?;
    for version in versions {
        buffer.write_u32(*version)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_version_negotiation() {
        let dcid = [1, 2, 3];
        let scid = [4, 5];
        let versions = [0x0000_0001u32, 0xff00_001du32];

        let len = encoded_len(&dcid, &scid, &versions);
        let mut out = vec![0u8; len];
        let mut buffer = EncoderBuffer::new(&mut out);
        encode(&dcid, &scid, &versions, &mut buffer).unwrap();
        assert_eq!(buffer.len(), len);

        let parsed = parse_version_negotiation(&out).unwrap();
        assert_eq!(parsed.destination_connection_id, &dcid);
        assert_eq!(parsed.source_connection_id, &scid);
        assert_eq!(parsed.supported_versions().collect::<Vec<_>>(), versions);
    }

    #[test]
    fn rejects_empty_version_list() {
        let dcid = [1u8];
        let scid = [2u8];
        let len = encoded_len(&dcid, &scid, &[]);
        let mut out = vec![0u8; len];
        let mut buffer = EncoderBuffer::new(&mut out);
        encode(&dcid, &scid, &[], &mut buffer).unwrap();
        assert!(parse_version_negotiation(&out).is_err());
    }
}
