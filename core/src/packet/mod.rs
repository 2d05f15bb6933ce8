//! Long/short packet header parsing and construction (RFC 9000 §17).
//!
//! None of these types touch the packet payload's encryption: parsing stops
//! at the payload boundary and hands back `(pn_offset, payload_start,
//! payload_end)` for the header-protection/AEAD collaborator to act on.

pub mod long;
pub mod retry;
pub mod short;
pub mod version_negotiation;

use crate::error::{CodecError, CodecResult, TransportError, FRAME_ENCODING_ERROR, PROTOCOL_VIOLATION};
use qcodec_buffer::DecoderBuffer;

/// Bit 0x80 of byte 0: long (1) vs short (0) header form.
pub const LONG_HEADER_BIT: u8 = 0x80;
/// Bit 0x40 of byte 0: the fixed bit. Must be 1 on every QUIC packet.
pub const FIXED_BIT: u8 = 0x40;
/// Bits 0x30 of byte 0 on a long header: the long packet type.
pub const LONG_TYPE_MASK: u8 = 0x30;
/// Bits 0x03 of byte 0: the packet number length, encoded as length - 1.
pub const PACKET_NUMBER_LEN_MASK: u8 = 0x03;

/// The smallest UDP datagram that may carry a client Initial packet
/// (RFC 9000 §14.1).
pub const MIN_INITIAL_DATAGRAM_LEN: usize = 1200;

/// Maximum length of a connection ID (RFC 9000 §17.2).
pub const MAX_CONNECTION_ID_LEN: usize = 20;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderForm {
    Long,
    Short,
}

#[inline]
pub fn header_form(first_byte: u8) -> HeaderForm {
    if first_byte & LONG_HEADER_BIT == LONG_HEADER_BIT {
        HeaderForm::Long
    } else {
        HeaderForm::Short
    }
}

#[inline]
pub fn check_fixed_bit(first_byte: u8) -> CodecResult<()> {
    if first_byte & FIXED_BIT == FIXED_BIT {
        Ok(())
    } else {
        Err(CodecError::Declined)
    }
}

/// Packet number space a frame was received in / is destined for. 0-RTT and
/// 1-RTT packets share the Application space for ack/loss bookkeeping, but
/// the frame permission matrix still distinguishes them (`0` vs `1` in
/// "IH01"), so this crate keeps all four as distinct encryption levels and
/// exposes `packet_number_space` for collaborators that only care about the
/// three-way split.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EncryptionLevel {
    Initial,
    Handshake,
    ZeroRtt,
    Application,
}

impl EncryptionLevel {
    #[inline]
    pub fn packet_number_space(self) -> PacketNumberSpace {
        match self {
            Self::Initial => PacketNumberSpace::Initial,
            Self::Handshake => PacketNumberSpace::Handshake,
            Self::ZeroRtt | Self::Application => PacketNumberSpace::Application,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PacketNumberSpace {
    Initial,
    Handshake,
    Application,
}

/// Everything the frame/AEAD collaborators need about one parsed packet.
/// Connection IDs, the token, and the payload all borrow from the
/// caller-owned datagram; this descriptor must not outlive it.
#[derive(Clone, Copy, Debug)]
pub struct PacketDescriptor<'a> {
    pub flags: u8,
    pub level: EncryptionLevel,
    /// `None` for short-header packets (the version was only on the wire
    /// once, during the long-header handshake phase).
    pub version: Option<u32>,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: Option<&'a [u8]>,
    /// Initial packets only.
    pub token: Option<&'a [u8]>,
    /// Width in bytes (1..=4) of the still-protected packet number field.
    pub packet_number_len: usize,
    /// Offset from the start of the datagram to the first packet-number
    /// byte, for the header-protection collaborator to unmask.
    pub packet_number_offset: usize,
    pub payload_start: usize,
    pub payload_end: usize,
    /// Scratch slot for the last parse failure observed while processing
    /// this packet's frames; the connection collaborator reads it to build
    /// a CONNECTION_CLOSE after a frame-parse error.
    pub last_error: Option<TransportError>,
}

impl<'a> PacketDescriptor<'a> {
    #[inline]
    pub fn record_error(&mut self, error: TransportError) {
        self.last_error = Some(error);
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_end - self.payload_start
    }
}

/// Reads the destination connection ID out of an arbitrary datagram without
/// fully parsing the header. Used by a dispatcher to route a datagram to
/// the right connection before any decryption has happened.
///
/// `short_header_dcid_len` is the ambient, server-configured DCID length
/// used for short headers — the short header carries no length field of
/// its own.
pub fn peek_destination_connection_id<'a>(
    datagram: &'a [u8],
    short_header_dcid_len: usize,
) -> CodecResult<&'a [u8]> {
    let first = datagram.first().copied().ok_or(CodecError::Declined)?;
    check_fixed_bit(first)?;

    match header_form(first) {
        HeaderForm::Short => {
            let buffer = DecoderBuffer::new(datagram).skip(1)?;
            let (dcid, _) = buffer.decode_slice(short_header_dcid_len)?;
            Ok(dcid.into_less_safe_slice())
        }
        HeaderForm::Long => {
            let buffer = DecoderBuffer::new(datagram).skip(1 + 4)?;
            let (dcid, _) = buffer.decode_slice_with_u8_len_prefix()?;
            Ok(dcid.into_less_safe_slice())
        }
    }
}

#[inline]
pub(crate) fn validate_connection_id_len(len: usize) -> CodecResult<()> {
    if len > MAX_CONNECTION_ID_LEN {
        Err(TransportError::new(PROTOCOL_VIOLATION, "connection id exceeds 20 bytes").into())
    } else {
        Ok(())
    }
}

#[inline]
pub(crate) fn frame_encoding_error(reason: &'static str) -> CodecError {
    TransportError::new(FRAME_ENCODING_ERROR, reason).into()
}
