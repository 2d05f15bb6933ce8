//! Long header packet forms (RFC 9000 §17.2): Initial, 0-RTT, Handshake.
//! Retry is laid out the same way up through the connection IDs but its
//! remainder is different enough to live in [`super::retry`].

use super::{
    check_fixed_bit, header_form, validate_connection_id_len, EncryptionLevel, HeaderForm,
    PacketDescriptor, FIXED_BIT, LONG_HEADER_BIT, LONG_TYPE_MASK, MIN_INITIAL_DATAGRAM_LEN,
    PACKET_NUMBER_LEN_MASK,
};
use crate::error::{CodecError, CodecResult, TransportError, FRAME_ENCODING_ERROR};
use crate::varint::{decode_slice_with_varint_len, VarInt};
use qcodec_buffer::{DecoderBuffer, EncoderBuffer};

/// Long-header packet type, bits 0x30 of byte 0 (RFC 9000 §17.2, v1 values).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LongPacketType {
    Initial,
    ZeroRtt,
    Handshake,
    Retry,
}

impl LongPacketType {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Initial,
            0b01 => Self::ZeroRtt,
            0b10 => Self::Handshake,
            _ => Self::Retry,
        }
    }

    #[inline]
    pub fn into_bits(self) -> u8 {
        match self {
            Self::Initial => 0b00,
            Self::ZeroRtt => 0b01,
            Self::Handshake => 0b10,
            Self::Retry => 0b11,
        }
    }

    #[inline]
    pub fn encryption_level(self) -> Option<EncryptionLevel> {
        match self {
            Self::Initial => Some(EncryptionLevel::Initial),
            Self::ZeroRtt => Some(EncryptionLevel::ZeroRtt),
            Self::Handshake => Some(EncryptionLevel::Handshake),
            Self::Retry => None,
        }
    }
}

/// The fields common to every long-header packet, version negotiation
/// included: `flags | version | dcid_len | dcid | scid_len | scid`.
#[derive(Clone, Copy, Debug)]
pub struct LongHeaderPrefix<'a> {
    pub flags: u8,
    pub version: u32,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
}

impl<'a> LongHeaderPrefix<'a> {
    pub fn packet_type(&self) -> LongPacketType {
        LongPacketType::from_bits((self.flags & LONG_TYPE_MASK) >> 4)
    }
}

#[inline]
pub(crate) fn offset_of(datagram: &[u8], buffer: DecoderBuffer<'_>) -> usize {
    datagram.len() - buffer.len()
}

/// Parses the shared long-header prefix. Callers dispatch on
/// `prefix.version == 0` (version negotiation) and otherwise on
/// `prefix.packet_type()` before parsing the type-specific remainder.
pub fn parse_prefix<'a>(
    datagram: &'a [u8],
) -> CodecResult<(LongHeaderPrefix<'a>, DecoderBuffer<'a>)> {
    let first = datagram.first().copied().ok_or(CodecError::Declined)?;
    if header_form(first) != HeaderForm::Long {
        return Err(CodecError::Declined);
    }
    check_fixed_bit(first)?;

    let buffer = DecoderBuffer::new(datagram).skip(1)?;
    let (version, buffer) = buffer.decode_u32()?;
    let (dcid, buffer) = buffer.decode_slice_with_u8_len_prefix()?;
    let (scid, buffer) = buffer.decode_slice_with_u8_len_prefix()?;

    let destination_connection_id = dcid.into_less_safe_slice();
    let source_connection_id = scid.into_less_safe_slice();
    validate_connection_id_len(destination_connection_id.len())?;
    validate_connection_id_len(source_connection_id.len())?;

    Ok((
        LongHeaderPrefix {
            flags: first,
            version,
            destination_connection_id,
            source_connection_id,
        },
        buffer,
    ))
}

pub(crate) fn packet_number_len_from_flags(flags: u8) -> usize {
    ((flags & PACKET_NUMBER_LEN_MASK) + 1) as usize
}

fn decode_packet_number(buffer: DecoderBuffer<'_>, len: usize) -> CodecResult<(u32, DecoderBuffer<'_>)> {
    let (value, buffer) = buffer.decode_slice(len)?;
    let bytes = value.into_less_safe_slice();
    let mut pn = 0u32;
    for b in bytes {
        pn = (pn << 8) | *b as u32;
    }
    Ok((pn, buffer))
}

/// Shared tail for Initial / 0-RTT / Handshake, once the type-specific
/// prefix (token, for Initial) has already been consumed: `length (varint),
/// packet number, payload`.
fn parse_length_pn_payload<'a>(
    datagram: &'a [u8],
    buffer: DecoderBuffer<'a>,
    flags: u8,
) -> CodecResult<(usize, usize, usize, usize)> {
    let (length, buffer) = VarInt::decode(buffer)?;
    let length = length.as_usize();

    let packet_number_len = packet_number_len_from_flags(flags);
    if length < packet_number_len {
        return Err(TransportError::new(FRAME_ENCODING_ERROR, "length field shorter than packet number").into());
    }

    let packet_number_offset = offset_of(datagram, buffer);
    let (_, buffer) = decode_packet_number(buffer, packet_number_len)?;
    let payload_start = offset_of(datagram, buffer);
    let payload_end = packet_number_offset + length;

    if payload_end > datagram.len() {
        return Err(TransportError::new(FRAME_ENCODING_ERROR, "length field exceeds datagram").into());
    }

    Ok((packet_number_len, packet_number_offset, payload_start, payload_end))
}

/// Parses an Initial packet (RFC 9000 §17.2.2). Rejects datagrams under
/// 1200 bytes, and versions not present in `supported_versions` (the caller
/// is expected to respond with version negotiation in that case).
pub fn parse_initial<'a>(
    datagram: &'a [u8],
    supported_versions: &[u32],
) -> CodecResult<PacketDescriptor<'a>> {
    if datagram.len() < MIN_INITIAL_DATAGRAM_LEN {
        return Err(CodecError::Declined);
    }

    let (prefix, buffer) = parse_prefix(datagram)?;
    if prefix.version == 0 || prefix.packet_type() != LongPacketType::Initial {
        return Err(CodecError::Declined);
    }
    if !supported_versions.contains(&prefix.version) {
        return Err(CodecError::Declined);
    }

    let (token, buffer) = decode_slice_with_varint_len(buffer)?;
    let (packet_number_len, packet_number_offset, payload_start, payload_end) =
        parse_length_pn_payload(datagram, buffer, prefix.flags)?;

    Ok(PacketDescriptor {
        flags: prefix.flags,
        level: EncryptionLevel::Initial,
        version: Some(prefix.version),
        destination_connection_id: prefix.destination_connection_id,
        source_connection_id: Some(prefix.source_connection_id),
        token: Some(token),
        packet_number_len,
        packet_number_offset,
        payload_start,
        payload_end,
        last_error: None,
    })
}

/// Parses a 0-RTT or Handshake packet (RFC 9000 §17.2.3, §17.2.4) — same
/// tail as Initial, minus the token.
pub fn parse_zero_rtt_or_handshake<'a>(
    datagram: &'a [u8],
    supported_versions: &[u32],
) -> CodecResult<PacketDescriptor<'a>> {
    let (prefix, buffer) = parse_prefix(datagram)?;
    let level = match prefix.packet_type() {
        LongPacketType::ZeroRtt => EncryptionLevel::ZeroRtt,
        LongPacketType::Handshake => EncryptionLevel::Handshake,
        _ => return Err(CodecError::Declined),
    };
    if prefix.version == 0 || !supported_versions.contains(&prefix.version) {
        return Err(CodecError::Declined);
    }

    let (packet_number_len, packet_number_offset, payload_start, payload_end) =
        parse_length_pn_payload(datagram, buffer, prefix.flags)?;

    Ok(PacketDescriptor {
        flags: prefix.flags,
        level,
        version: Some(prefix.version),
        destination_connection_id: prefix.destination_connection_id,
        source_connection_id: Some(prefix.source_connection_id),
        token: None,
        packet_number_len,
        packet_number_offset,
        payload_start,
        payload_end,
        last_error: None,
    })
}

/// Fields needed to build an Initial header. Two-pass: call [`header_len`]
/// with the eventual payload length to size a buffer, then [`write_header`]
/// to fill it; the returned offset is where the packet-number bytes start,
/// for the header-protection collaborator to mask in place afterwards.
pub struct InitialHeaderFields<'a> {
    pub version: u32,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    pub token: &'a [u8],
    pub packet_number_len: usize,
}

impl<'a> InitialHeaderFields<'a> {
    pub fn header_len(&self, payload_len: usize) -> usize {
        let length_value = self.packet_number_len + payload_len;
        1 + 4
            + 1
            + self.destination_connection_id.len()
            + 1
            + self.source_connection_id.len()
            + VarInt::try_from(self.token.len() as u64).unwrap().encoding_size()
            + self.token.len()
            + VarInt::try_from(length_value as u64).unwrap().encoding_size()
            + self.packet_number_len
    }

    /// Writes the header (everything up to, but not including, the
    /// payload) and returns the offset of the packet-number field.
    pub fn write_header(
        &self,
        payload_len: usize,
        buffer: &mut EncoderBuffer<'_>,
    ) -> Result<usize, qcodec_buffer::EncoderError> {
        let mut tag = LONG_HEADER_BIT | FIXED_BIT | (LongPacketType::Initial.into_bits() << 4);
        tag |= (self.packet_number_len as u8 - 1) & PACKET_NUMBER_LEN_MASK;
        buffer.write_u8(tag)?;
        buffer.write_u32(self.version)?;
        buffer.write_u8(self.destination_connection_id.len() as u8)?;
        buffer.write_slice(self.destination_connection_id)?;
        buffer.write_u8(self.source_connection_id.len() as u8)?;
        buffer.write_slice(self.source_connection_id)?;

        let token_len = VarInt::try_from(self.token.len() as u64).unwrap();
        token_len.encode(buffer)?;
        buffer.write_slice(self.token)?;

        let length_value = VarInt::try_from((self.packet_number_len + payload_len) as u64).unwrap();
        length_value.encode(buffer)?;

        let pn_offset = buffer.len();
        buffer.write_slice(&truncated_packet_number_bytes(0, self.packet_number_len))?;
        Ok(pn_offset)
    }
}

/// Same two-pass contract as [`InitialHeaderFields`], for 0-RTT/Handshake.
pub struct LongHeaderFields<'a> {
    pub packet_type: LongPacketType,
    pub version: u32,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    pub packet_number_len: usize,
}

impl<'a> LongHeaderFields<'a> {
    pub fn header_len(&self, payload_len: usize) -> usize {
        let length_value = self.packet_number_len + payload_len;
        1 + 4
            + 1
            + self.destination_connection_id.len()
            + 1
            + self.source_connection_id.len()
            + VarInt::try_from(length_value as u64).unwrap().encoding_size()
            + self.packet_number_len
    }

    pub fn write_header(
        &self,
        payload_len: usize,
        buffer: &mut EncoderBuffer<'_>,
    ) -> Result<usize, qcodec_buffer::EncoderError> {
        let mut tag = LONG_HEADER_BIT | FIXED_BIT | (self.packet_type.into_bits() << 4);
        tag |= (self.packet_number_len as u8 - 1) & PACKET_NUMBER_LEN_MASK;
        buffer.write_u8(tag)?;
        buffer.write_u32(self.version)?;
        buffer.write_u8(self.destination_connection_id.len() as u8)?;
        buffer.write_slice(self.destination_connection_id)?;
        buffer.write_u8(self.source_connection_id.len() as u8)?;
        buffer.write_slice(self.source_connection_id)?;

        let length_value = VarInt::try_from((self.packet_number_len + payload_len) as u64).unwrap();
        length_value.encode(buffer)?;

        let pn_offset = buffer.len();
        buffer.write_slice(&truncated_packet_number_bytes(0, self.packet_number_len))?;
        Ok(pn_offset)
    }
}

fn truncated_packet_number_bytes(value: u32, len: usize) -> [u8; 4] {
    let bytes = value.to_be_bytes();
    let mut out = [0u8; 4];
    out[4 - len..].copy_from_slice(&bytes[4 - len..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds the S2 scenario datagram: flags 0xc3, version 1, an 8-byte
    /// all-zero DCID, an empty SCID, no token, length varint 0x4b08
    /// (2824 = 4-byte packet number + 2820-byte payload).
    fn s2_datagram() -> Vec<u8> {
        let mut d = vec![0xc3u8];
        d.extend_from_slice(&1u32.to_be_bytes());
        d.push(8);
        d.extend_from_slice(&[0u8; 8]);
        d.push(0); // scid_len = 0
        d.push(0x00); // token length varint = 0 (no token)
        d.extend_from_slice(&[0x4b, 0x08]); // length varint = 2824
        d.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // 4-byte packet number
        d.resize(d.len() + 2820, 0);
        d
    }

    #[test]
    fn parses_s2_initial_header() {
        let datagram = s2_datagram();
        assert!(datagram.len() >= MIN_INITIAL_DATAGRAM_LEN);
        let descriptor = parse_initial(&datagram, &[1]).unwrap();
        assert_eq!(descriptor.level, EncryptionLevel::Initial);
        assert_eq!(descriptor.token, Some(&[][..]));
        assert_eq!(descriptor.packet_number_len, 4);
        // Walking the layout byte-by-byte (flags 1 + version 4 + dcid_len 1
        // + dcid 8 + scid_len 1 + scid 0 + token-length varint 1 + length
        // varint 2) puts the packet number at offset 18, not the 23 this
        // scenario's prose claims; see the grounding ledger's note on this
        // discrepancy. 18 is what RFC 9000 §17.2.2's field layout produces
        // for these exact field values, so that is what this test asserts.
        assert_eq!(descriptor.packet_number_offset, 18);
        assert_eq!(
            descriptor.packet_number_offset + descriptor.packet_number_len,
            descriptor.payload_start
        );
        assert_eq!(descriptor.payload_len(), 2820);
    }

    #[test]
    fn rejects_undersized_initial_datagram() {
        let mut datagram = s2_datagram();
        datagram.truncate(MIN_INITIAL_DATAGRAM_LEN - 1);
        assert_eq!(parse_initial(&datagram, &[1]), Err(CodecError::Declined));
    }

    #[test]
    fn rejects_missing_fixed_bit() {
        let mut datagram = s2_datagram();
        datagram[0] &= !FIXED_BIT;
        assert_eq!(parse_initial(&datagram, &[1]), Err(CodecError::Declined));
    }
}
