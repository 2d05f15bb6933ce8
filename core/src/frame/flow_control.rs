//! Flow-control and blocked-signal frames (RFC 9000 §19.9-19.14, §19.16-19.17):
//! MAX_DATA, MAX_STREAM_DATA, MAX_STREAMS, DATA_BLOCKED, STREAM_DATA_BLOCKED,
//! STREAMS_BLOCKED. All of these share the same shape — one or two varints —
//! so each gets a thin wrapper type rather than its own hand-written codec.

use crate::error::CodecResult;
use crate::varint::VarInt;
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

pub const MAX_DATA_TAG: u8 = 0x10;
pub const MAX_STREAM_DATA_TAG: u8 = 0x11;
pub const MAX_STREAMS_BIDI_TAG: u8 = 0x12;
pub const MAX_STREAMS_UNI_TAG: u8 = 0x13;
pub const DATA_BLOCKED_TAG: u8 = 0x14;
pub const STREAM_DATA_BLOCKED_TAG: u8 = 0x15;
pub const STREAMS_BLOCKED_BIDI_TAG: u8 = 0x16;
pub const STREAMS_BLOCKED_UNI_TAG: u8 = 0x17;

/// MAX_DATA (0x10).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaxData {
    pub maximum_data: VarInt,
}

pub fn parse_max_data(buffer: DecoderBuffer<'_>) -> CodecResult<(MaxData, DecoderBuffer<'_>)> {
    let (maximum_data, buffer) = VarInt::decode(buffer)?;
    Ok((MaxData { maximum_data }, buffer))
}

impl MaxData {
    pub fn encoded_len(&self) -> usize {
        1 + self.maximum_data.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(MAX_DATA_TAG)?;
        self.maximum_data.encode(buffer)
    }
}

/// DATA_BLOCKED (0x14).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DataBlocked {
    pub maximum_data: VarInt,
}

pub fn parse_data_blocked(buffer: DecoderBuffer<'_>) -> CodecResult<(DataBlocked, DecoderBuffer<'_>)> {
    let (maximum_data, buffer) = VarInt::decode(buffer)?;
    Ok((DataBlocked { maximum_data }, buffer))
}

impl DataBlocked {
    pub fn encoded_len(&self) -> usize {
        1 + self.maximum_data.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(DATA_BLOCKED_TAG)?;
        self.maximum_data.encode(buffer)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaxStreamData {
    pub stream_id: VarInt,
    pub maximum_stream_data: VarInt,
}

pub fn parse_max_stream_data(buffer: DecoderBuffer<'_>) -> CodecResult<(MaxStreamData, DecoderBuffer<'_>)> {
    let (stream_id, buffer) = VarInt::decode(buffer)?;
    let (maximum_stream_data, buffer) = VarInt::decode(buffer)?;
    Ok((
        MaxStreamData {
            stream_id,
            maximum_stream_data,
        },
        buffer,
    ))
}

impl MaxStreamData {
    pub fn encoded_len(&self) -> usize {
        1 + self.stream_id.encoding_size() + self.maximum_stream_data.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(MAX_STREAM_DATA_TAG)?;
        self.stream_id.encode(buffer)?;
        self.maximum_stream_data.encode(buffer)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamDataBlocked {
    pub stream_id: VarInt,
    pub maximum_stream_data: VarInt,
}

pub fn parse_stream_data_blocked(
    buffer: DecoderBuffer<'_>,
) -> CodecResult<(StreamDataBlocked, DecoderBuffer<'_>)> {
    let (stream_id, buffer) = VarInt::decode(buffer)?;
    let (maximum_stream_data, buffer) = VarInt::decode(buffer)?;
    Ok((
        StreamDataBlocked {
            stream_id,
            maximum_stream_data,
        },
        buffer,
    ))
}

impl StreamDataBlocked {
    pub fn encoded_len(&self) -> usize {
        1 + self.stream_id.encoding_size() + self.maximum_stream_data.encoding_size()
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(STREAM_DATA_BLOCKED_TAG)?;
        self.stream_id.encode(buffer)?;
        self.maximum_stream_data.encode(buffer)
    }
}

/// MAX_STREAMS / STREAMS_BLOCKED, either bidirectional or unidirectional.
/// The direction is carried by which of the two type codes was used to
/// parse/build this value, not by a field on the struct.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaxStreams {
    pub maximum_streams: VarInt,
}

pub fn parse_max_streams(buffer: DecoderBuffer<'_>) -> CodecResult<(MaxStreams, DecoderBuffer<'_>)> {
    let (maximum_streams, buffer) = VarInt::decode(buffer)?;
    Ok((MaxStreams { maximum_streams }, buffer))
}

impl MaxStreams {
    pub fn encoded_len(&self) -> usize {
        1 + self.maximum_streams.encoding_size()
    }

    pub fn encode(&self, tag: u8, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(tag)?;
        self.maximum_streams.encode(buffer)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamsBlocked {
    pub maximum_streams: VarInt,
}

pub fn parse_streams_blocked(buffer: DecoderBuffer<'_>) -> CodecResult<(StreamsBlocked, DecoderBuffer<'_>)> {
    let (maximum_streams, buffer) = VarInt::decode(buffer)?;
    Ok((StreamsBlocked { maximum_streams }, buffer))
}

impl StreamsBlocked {
    pub fn encoded_len(&self) -> usize {
        1 + self.maximum_streams.encoding_size()
    }

    pub fn encode(&self, tag: u8, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(tag)?;
        self.maximum_streams.encode(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_max_data() {
        let frame = MaxData {
            maximum_data: VarInt::try_from(1_000_000u64).unwrap(),
        };
        let mut out = vec![0u8; frame.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        frame.encode(&mut buffer).unwrap();
        assert_eq!(out[0], MAX_DATA_TAG);
        let (parsed, rest) = parse_max_data(DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, frame);
    }

    #[test]
    fn round_trips_max_streams_bidi_and_uni() {
        let frame = MaxStreams {
            maximum_streams: VarInt::try_from(100u64).unwrap(),
        };
        for tag in [MAX_STREAMS_BIDI_TAG, MAX_STREAMS_UNI_TAG] {
            let mut out = vec![0u8; frame.encoded_len()];
            let mut buffer = EncoderBuffer::new(&mut out);
            frame.encode(tag, &mut buffer).unwrap();
            assert_eq!(out[0], tag);
            let (parsed, rest) = parse_max_streams(DecoderBuffer::new(&out[1..])).unwrap();
            assert!(rest.is_empty());
            assert_eq!(parsed, frame);
        }
    }
}
