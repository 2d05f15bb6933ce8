//! Short (1-RTT) header packets (RFC 9000 §17.3.1). No Length field: the
//! packet extends to the end of the datagram it was carried in.

use super::long::{offset_of, packet_number_len_from_flags};
use super::{
    check_fixed_bit, header_form, EncryptionLevel, HeaderForm, PacketDescriptor, FIXED_BIT,
    PACKET_NUMBER_LEN_MASK,
};
use crate::error::CodecResult;
use qcodec_buffer::{DecoderBuffer, EncoderBuffer};

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.3.1
//# Spin Bit:  The third most significant bit (0x20) of byte 0 is the
//#    latency spin bit, set as described in Section 17.4.
const SPIN_BIT_MASK: u8 = 0x20;
const KEY_PHASE_MASK: u8 = 0x04;
const ENCODING_TAG: u8 = 0x40;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpinBit {
    Zero,
    One,
}

impl SpinBit {
    #[inline]
    fn from_flags(flags: u8) -> Self {
        if flags & SPIN_BIT_MASK == SPIN_BIT_MASK {
            Self::One
        } else {
            Self::Zero
        }
    }

    #[inline]
    fn mask(self) -> u8 {
        match self {
            Self::One => SPIN_BIT_MASK,
            Self::Zero => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyPhase {
    Zero,
    One,
}

impl KeyPhase {
    #[inline]
    fn from_flags(flags: u8) -> Self {
        if flags & KEY_PHASE_MASK == KEY_PHASE_MASK {
            Self::One
        } else {
            Self::Zero
        }
    }

    #[inline]
    fn mask(self) -> u8 {
        match self {
            Self::One => KEY_PHASE_MASK,
            Self::Zero => 0,
        }
    }
}

impl PacketDescriptor<'_> {
    #[inline]
    pub fn spin_bit(&self) -> Option<SpinBit> {
        (self.level == EncryptionLevel::Application).then(|| SpinBit::from_flags(self.flags))
    }

    #[inline]
    pub fn key_phase(&self) -> Option<KeyPhase> {
        (self.level == EncryptionLevel::Application).then(|| KeyPhase::from_flags(self.flags))
    }
}

/// Parses a short header. `destination_connection_id_len` is the ambient,
/// server-configured DCID length — the short header carries no length
/// field of its own.
pub fn parse_short<'a>(
    datagram: &'a [u8],
    destination_connection_id_len: usize,
) -> CodecResult<PacketDescriptor<'a>> {
    let first = *datagram.first().ok_or(crate::error::CodecError::Declined)?;
    if header_form(first) != HeaderForm::Short {
        return Err(crate::error::CodecError::Declined);
    }
    check_fixed_bit(first)?;

    let buffer = DecoderBuffer::new(datagram).skip(1)?;
    let (dcid, buffer) = buffer.decode_slice(destination_connection_id_len)?;

    let packet_number_len = packet_number_len_from_flags(first);
    let packet_number_offset = offset_of(datagram, buffer);
    let buffer = buffer.skip(packet_number_len)?;
    let payload_start = offset_of(datagram, buffer);

    Ok(PacketDescriptor {
        flags: first,
        level: EncryptionLevel::Application,
        version: None,
        destination_connection_id: dcid.into_less_safe_slice(),
        source_connection_id: None,
        token: None,
        packet_number_len,
        packet_number_offset,
        payload_start,
        payload_end: datagram.len(),
        last_error: None,
    })
}

/// Two-pass builder fields for a short header.
pub struct ShortHeaderFields<'a> {
    pub spin_bit: SpinBit,
    pub key_phase: KeyPhase,
    pub destination_connection_id: &'a [u8],
    pub packet_number_len: usize,
}

impl<'a> ShortHeaderFields<'a> {
    #[inline]
    pub fn header_len(&self) -> usize {
        1 + self.destination_connection_id.len() + self.packet_number_len
    }

    /// Writes the header and returns the offset of the packet-number field.
    pub fn write_header(
        &self,
        buffer: &mut EncoderBuffer<'_>,
    ) -> Result<usize, qcodec_buffer::EncoderError> {
        let mut tag = ENCODING_TAG | FIXED_BIT | self.spin_bit.mask() | self.key_phase.mask();
        tag |= (self.packet_number_len as u8 - 1) & PACKET_NUMBER_LEN_MASK;
        buffer.write_u8(tag)?;
        buffer.write_slice(self.destination_connection_id)?;
        let pn_offset = buffer.len();
        buffer.write_slice(&[0u8; 4][..self.packet_number_len])?;
        Ok(pn_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_header() {
        let mut datagram = vec![0b0100_0001u8]; // fixed bit, pn_len=2
        datagram.extend_from_slice(&[0xaa; 8]); // dcid
        datagram.extend_from_slice(&[0x00, 0x01]); // packet number
        datagram.extend_from_slice(b"payload");

        let descriptor = parse_short(&datagram, 8).unwrap();
        assert_eq!(descriptor.level, EncryptionLevel::Application);
        assert_eq!(descriptor.destination_connection_id, &[0xaa; 8]);
        assert_eq!(descriptor.packet_number_len, 2);
        assert_eq!(descriptor.payload_len(), 7);
        assert_eq!(descriptor.spin_bit(), Some(SpinBit::Zero));
    }

    #[test]
    fn missing_fixed_bit_is_declined() {
        let datagram = [0x00u8, 0xaa, 0xaa];
        assert_eq!(
            parse_short(&datagram, 1),
            Err(crate::error::CodecError::Declined)
        );
    }
}
