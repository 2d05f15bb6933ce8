//! Stream data and lifecycle frames: RESET_STREAM, STOP_SENDING, CRYPTO,
//! NEW_TOKEN, STREAM (RFC 9000 §19.4-19.8).

use crate::error::CodecResult;
use crate::varint::{decode_slice_with_varint_len, encode_slice_with_varint_len, VarInt};
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

pub const RESET_STREAM_TAG: u8 = 0x04;
pub const STOP_SENDING_TAG: u8 = 0x05;
pub const CRYPTO_TAG: u8 = 0x06;
pub const NEW_TOKEN_TAG: u8 = 0x07;

/// Low 3 bits of the type byte select OFF (0x04)/LEN (0x02)/FIN (0x01).
pub const STREAM_TAG_BASE: u8 = 0x08;
const STREAM_OFF_BIT: u8 = 0x04;
const STREAM_LEN_BIT: u8 = 0x02;
const STREAM_FIN_BIT: u8 = 0x01;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResetStream {
    pub stream_id: VarInt,
    pub application_error_code: VarInt,
    pub final_size: VarInt,
}

pub fn parse_reset_stream(buffer: DecoderBuffer<'_>) -> CodecResult<(ResetStream, DecoderBuffer<'_>)> {
    let (stream_id, buffer) = VarInt::decode(buffer)?;
    let (application_error_code, buffer) = VarInt::decode(buffer)?;
    let (final_size, buffer) = VarInt::decode(buffer)?;
    Ok((
        ResetStream {
            stream_id,
            application_error_code,
            final_size,
        },
        buffer,
    ))
}

impl ResetStream {
    pub fn encoded_len(&self) -> usize {
        1 + self.stream_id.encoding_size()
            + self.application_error_code.encoding_size()
            + self.final_size.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(RESET_STREAM_TAG)?;
        self.stream_id.encode(buffer)?;
        self.application_error_code.encode(buffer)?;
        self.final_size.encode(buffer)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StopSending {
    pub stream_id: VarInt,
    pub application_error_code: VarInt,
}

pub fn parse_stop_sending(buffer: DecoderBuffer<'_>) -> CodecResult<(StopSending, DecoderBuffer<'_>)> {
    let (stream_id, buffer) = VarInt::decode(buffer)?;
    let (application_error_code, buffer) = VarInt::decode(buffer)?;
    Ok((
        StopSending {
            stream_id,
            application_error_code,
        },
        buffer,
    ))
}

impl StopSending {
    pub fn encoded_len(&self) -> usize {
        1 + self.stream_id.encoding_size() + self.application_error_code.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(STOP_SENDING_TAG)?;
        self.stream_id.encode(buffer)?;
        self.application_error_code.encode(buffer)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Crypto<'a> {
    pub offset: VarInt,
    pub data: &'a [u8],
}

pub fn parse_crypto<'a>(buffer: DecoderBuffer<'a>) -> CodecResult<(Crypto<'a>, DecoderBuffer<'a>)> {
    let (offset, buffer) = VarInt::decode(buffer)?;
    let (data, buffer) = decode_slice_with_varint_len(buffer)?;
    Ok((Crypto { offset, data }, buffer))
}

impl Crypto<'_> {
    pub fn encoded_len(&self) -> usize {
        1 + self.offset.encoding_size()
            + VarInt::try_from(self.data.len() as u64).expect("crypto data fits a varint length").encoding_size()
            + self.data.len()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(CRYPTO_TAG)?;
        self.offset.encode(buffer)?;
        encode_slice_with_varint_len(buffer, self.data)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NewToken<'a> {
    pub token: &'a [u8],
}

pub fn parse_new_token<'a>(buffer: DecoderBuffer<'a>) -> CodecResult<(NewToken<'a>, DecoderBuffer<'a>)> {
    let (token, buffer) = decode_slice_with_varint_len(buffer)?;
    Ok((NewToken { token }, buffer))
}

impl NewToken<'_> {
    pub fn encoded_len(&self) -> usize {
        1 + VarInt::try_from(self.token.len() as u64).expect("token fits a varint length").encoding_size()
            + self.token.len()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(NEW_TOKEN_TAG)?;
        encode_slice_with_varint_len(buffer, self.token)
    }
}

/// A STREAM frame (RFC 9000 §19.8). When the type byte's LEN bit is unset,
/// the data extends to the end of the packet, so `parse` needs to know
/// whether it's looking at the last frame of the datagram.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stream<'a> {
    pub stream_id: VarInt,
    pub offset: VarInt,
    pub fin: bool,
    pub data: &'a [u8],
}

impl Stream<'_> {
    pub fn tag(&self) -> u8 {
        let mut tag = STREAM_TAG_BASE | STREAM_LEN_BIT;
        if self.offset.as_u64() != 0 {
            tag |= STREAM_OFF_BIT;
        }
        if self.fin {
            tag |= STREAM_FIN_BIT;
        }
        tag
    }
}

pub fn parse_stream<'a>(tag: u8, buffer: DecoderBuffer<'a>) -> CodecResult<(Stream<'a>, DecoderBuffer<'a>)> {
    let (stream_id, buffer) = VarInt::decode(buffer)?;
    let (offset, buffer) = if tag & STREAM_OFF_BIT != 0 {
        VarInt::decode(buffer)?
    } else {
        (VarInt::ZERO, buffer)
    };
    let (data, buffer) = if tag & STREAM_LEN_BIT != 0 {
        decode_slice_with_varint_len(buffer)?
    } else {
        (buffer.into_less_safe_slice(), DecoderBuffer::new(&[]))
    };
    let fin = tag & STREAM_FIN_BIT != 0;

    Ok((
        Stream {
            stream_id,
            offset,
            fin,
            data,
        },
        buffer,
    ))
}

impl Stream<'_> {
    /// Always writes an explicit length (the LEN bit), which is simpler and
    /// equally valid; implicit-length framing is purely a receive-side
    /// optimization other implementations use to save a byte on the last
    /// frame of a packet.
    pub fn encoded_len(&self) -> usize {
        let mut len = 1 + self.stream_id.encoding_size();
        if self.offset.as_u64() != 0 {
            len += self.offset.encoding_size();
        }
        len += VarInt::try_from(self.data.len() as u64).expect("stream data fits a varint length").encoding_size();
        len + self.data.len()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(self.tag())?;
        self.stream_id.encode(buffer)?;
        if self.offset.as_u64() != 0 {
            self.offset.encode(buffer)?;
        }
        encode_slice_with_varint_len(buffer, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_stream_with_fin() {
        let stream = Stream {
            stream_id: VarInt::try_from(4u64).unwrap(),
            offset: VarInt::ZERO,
            fin: true,
            data: b"hello",
        };
        let mut out = vec![0u8; stream.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        stream.encode(&mut buffer).unwrap();

        let (parsed, rest) = parse_stream(out[0], DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, stream);
    }

    #[test]
    fn implicit_length_consumes_rest_of_buffer() {
        let tag = STREAM_TAG_BASE; // no OFF, no LEN, no FIN
        let mut payload = vec![];
        let mut buf = [0u8; 8];
        let mut encoder = EncoderBuffer::new(&mut buf);
        VarInt::try_from(1u64).unwrap().encode(&mut encoder).unwrap();
        payload.extend_from_slice(&buf[..encoder.len()]);
        payload.extend_from_slice(b"rest-of-packet");

        let (stream, rest) = parse_stream(tag, DecoderBuffer::new(&payload)).unwrap();
        assert!(rest.is_empty());
        assert_eq!(stream.data, b"rest-of-packet");
        assert!(!stream.fin);
    }

    #[test]
    fn round_trips_reset_stream() {
        let reset = ResetStream {
            stream_id: VarInt::try_from(9u64).unwrap(),
            application_error_code: VarInt::try_from(1u64).unwrap(),
            final_size: VarInt::try_from(1024u64).unwrap(),
        };
        let mut out = vec![0u8; reset.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        reset.encode(&mut buffer).unwrap();
        assert_eq!(out[0], RESET_STREAM_TAG);
        let (parsed, rest) = parse_reset_stream(DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, reset);
    }
}
