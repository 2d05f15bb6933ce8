//! QUIC frames (RFC 9000 §19) and the packet-type permission matrix that
//! governs which frames may appear at which encryption level (§12.4 Table 3).
//!
//! Every frame type gets its own small module; this one ties them together
//! into a single [`Frame`] sum type plus the `parse`/`encoded_len`/`encode`
//! entry points a packet-payload loop drives frame by frame.

pub mod ack;
pub mod connection_close;
pub mod connection_id;
pub mod flow_control;
pub mod misc;
pub mod path;
pub mod stream;

use crate::error::CodecResult;
use crate::packet::{frame_encoding_error, EncryptionLevel};
use crate::varint::VarInt;
use ack::Ack;
use connection_close::ConnectionClose;
use connection_id::{NewConnectionId, RetireConnectionId};
use flow_control::{DataBlocked, MaxData, MaxStreamData, MaxStreams, StreamDataBlocked, StreamsBlocked};
use misc::Padding;
use path::{PathChallenge, PathResponse};
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};
use stream::{Crypto, NewToken, ResetStream, StopSending, Stream};

/// One parsed QUIC frame, tagged by which of the nineteen wire shapes it is.
/// `MaxStreams`/`StreamsBlocked` carry a `bidirectional` flag rather than
/// being split into four variants, since the two directions share a payload
/// shape and differ only in type code.
#[derive(Clone, Copy, Debug)]
pub enum Frame<'a> {
    Padding(Padding),
    Ping,
    Ack(Ack<'a>),
    ResetStream(ResetStream),
    StopSending(StopSending),
    Crypto(Crypto<'a>),
    NewToken(NewToken<'a>),
    Stream(Stream<'a>),
    MaxData(MaxData),
    MaxStreamData(MaxStreamData),
    MaxStreams { bidirectional: bool, frame: MaxStreams },
    DataBlocked(DataBlocked),
    StreamDataBlocked(StreamDataBlocked),
    StreamsBlocked { bidirectional: bool, frame: StreamsBlocked },
    NewConnectionId(NewConnectionId<'a>),
    RetireConnectionId(RetireConnectionId),
    PathChallenge(PathChallenge),
    PathResponse(PathResponse),
    ConnectionClose(ConnectionClose<'a>),
    HandshakeDone,
}

/// Bits of the IH01 permission mask (RFC 9000 §12.4 Table 3): which of the
/// four encryption levels a frame type is allowed to appear at.
mod level_bit {
    pub const INITIAL: u8 = 0b1000;
    pub const HANDSHAKE: u8 = 0b0100;
    pub const ZERO_RTT: u8 = 0b0010;
    pub const APPLICATION: u8 = 0b0001;
    pub const IH01: u8 = INITIAL | HANDSHAKE | ZERO_RTT | APPLICATION;
    pub const IH_1: u8 = INITIAL | HANDSHAKE | APPLICATION;
    pub const ZERO_1: u8 = ZERO_RTT | APPLICATION;
    pub const ONE: u8 = APPLICATION;
}

fn level_bit(level: EncryptionLevel) -> u8 {
    match level {
        EncryptionLevel::Initial => level_bit::INITIAL,
        EncryptionLevel::Handshake => level_bit::HANDSHAKE,
        EncryptionLevel::ZeroRtt => level_bit::ZERO_RTT,
        EncryptionLevel::Application => level_bit::APPLICATION,
    }
}

/// The permission mask for a given wire type code, or `None` if `tag` is not
/// one of the known frame types at all. NEW_TOKEN and HANDSHAKE_DONE are
/// known types whose mask is legitimately `0`: both are server-to-client
/// only and must never appear on the receive path (RFC 9000 §12.4 Table 3;
/// `ngx_quic_frame_masks[]` in the nginx QUIC transport source agrees).
/// Returning `Some(0)` rather than folding them into the `None`/unknown-tag
/// case lets the caller still recognize the frame type and report
/// `PROTOCOL_VIOLATION` rather than `FRAME_ENCODING_ERROR`.
fn permission_mask(tag: u64) -> Option<u8> {
    use level_bit::*;
    Some(match tag {
        0x00 | 0x01 => IH01,                         // PADDING, PING
        0x02 | 0x03 => IH_1,                          // ACK, ACK_ECN
        0x04 | 0x05 => ZERO_1,                        // RESET_STREAM, STOP_SENDING
        0x06 => IH_1,                                 // CRYPTO
        0x07 => 0,                                    // NEW_TOKEN: server-to-client only
        0x08..=0x0f => ZERO_1,                        // STREAM
        0x10..=0x17 => ZERO_1,                        // MAX_DATA .. STREAMS_BLOCKED
        0x18..=0x1b => ZERO_1,                        // NEW_CONNECTION_ID .. PATH_RESPONSE
        0x1c => IH01,                                 // CONNECTION_CLOSE (transport)
        0x1d => ONE,                                  // CONNECTION_CLOSE (application)
        0x1e => 0,                                    // HANDSHAKE_DONE: server-to-client only
        _ => return None,
    })
}

impl Frame<'_> {
    /// The wire type code this frame was (or would be) tagged with.
    pub fn tag(&self) -> u8 {
        match self {
            Frame::Padding(_) => misc::PADDING_TAG,
            Frame::Ping => misc::PING_TAG,
            Frame::Ack(ack) => ack.tag(),
            Frame::ResetStream(_) => stream::RESET_STREAM_TAG,
            Frame::StopSending(_) => stream::STOP_SENDING_TAG,
            Frame::Crypto(_) => stream::CRYPTO_TAG,
            Frame::NewToken(_) => stream::NEW_TOKEN_TAG,
            Frame::Stream(frame) => frame.tag(),
            Frame::MaxData(_) => flow_control::MAX_DATA_TAG,
            Frame::MaxStreamData(_) => flow_control::MAX_STREAM_DATA_TAG,
            Frame::MaxStreams { bidirectional, .. } => {
                if *bidirectional {
                    flow_control::MAX_STREAMS_BIDI_TAG
                } else {
                    flow_control::MAX_STREAMS_UNI_TAG
                }
            }
            Frame::DataBlocked(_) => flow_control::DATA_BLOCKED_TAG,
            Frame::StreamDataBlocked(_) => flow_control::STREAM_DATA_BLOCKED_TAG,
            Frame::StreamsBlocked { bidirectional, .. } => {
                if *bidirectional {
                    flow_control::STREAMS_BLOCKED_BIDI_TAG
                } else {
                    flow_control::STREAMS_BLOCKED_UNI_TAG
                }
            }
            Frame::NewConnectionId(_) => connection_id::NEW_CONNECTION_ID_TAG,
            Frame::RetireConnectionId(_) => connection_id::RETIRE_CONNECTION_ID_TAG,
            Frame::PathChallenge(_) => path::PATH_CHALLENGE_TAG,
            Frame::PathResponse(_) => path::PATH_RESPONSE_TAG,
            Frame::ConnectionClose(close) => {
                if close.is_application {
                    connection_close::APPLICATION_ERROR_TAG
                } else {
                    connection_close::QUIC_ERROR_TAG
                }
            }
            Frame::HandshakeDone => misc::HANDSHAKE_DONE_TAG,
        }
    }

    /// Every frame is ack-eliciting except ACK, PADDING, and CONNECTION_CLOSE
    /// (RFC 9000 §13.2).
    pub fn is_ack_eliciting(&self) -> bool {
        !matches!(
            self,
            Frame::Ack(_) | Frame::Padding(_) | Frame::ConnectionClose(_)
        )
    }

    /// Whether this frame type is permitted in a packet at `level`, per the
    /// §12.4 Table 3 permission matrix.
    pub fn permitted_at(&self, level: EncryptionLevel) -> bool {
        permission_mask(self.tag() as u64).unwrap_or(0) & level_bit(level) != 0
    }
}

/// Parses one frame from `buffer`, which must be positioned at a frame type
/// byte. `level` gates which frame types are accepted here: a frame whose
/// type is well-formed but disallowed at this level yields
/// `PROTOCOL_VIOLATION` without attempting to parse its fields.
pub fn parse_frame<'a>(
    buffer: DecoderBuffer<'a>,
    level: EncryptionLevel,
) -> CodecResult<(Frame<'a>, DecoderBuffer<'a>)> {
    let (type_value, rest) = VarInt::decode(buffer)?;
    let tag = type_value.as_u64();

    let mask = match permission_mask(tag) {
        Some(mask) => mask,
        None => {
            #[cfg(feature = "tracing")]
            tracing::debug!(frame_type = tag, "rejecting unknown frame type");
            return Err(frame_encoding_error("unknown frame type"));
        }
    };
    if mask & level_bit(level) == 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(frame_type = tag, ?level, "frame not permitted at this encryption level");
        return Err(crate::error::TransportError::new(
            crate::error::PROTOCOL_VIOLATION,
            "frame type not permitted at this encryption level",
        )
        .with_frame_type(type_value)
        .into());
    }

    match tag {
        0x00 => {
            let (padding, rest) = misc::parse_padding(rest);
            Ok((Frame::Padding(padding), rest))
        }
        0x01 => Ok((Frame::Ping, rest)),
        0x02 | 0x03 => {
            let (ack, rest) = ack::parse(tag as u8, rest)?;
            Ok((Frame::Ack(ack), rest))
        }
        0x04 => {
            let (frame, rest) = stream::parse_reset_stream(rest)?;
            Ok((Frame::ResetStream(frame), rest))
        }
        0x05 => {
            let (frame, rest) = stream::parse_stop_sending(rest)?;
            Ok((Frame::StopSending(frame), rest))
        }
        0x06 => {
            let (frame, rest) = stream::parse_crypto(rest)?;
            Ok((Frame::Crypto(frame), rest))
        }
        0x07 => {
            let (frame, rest) = stream::parse_new_token(rest)?;
            Ok((Frame::NewToken(frame), rest))
        }
        0x08..=0x0f => {
            let (frame, rest) = stream::parse_stream(tag as u8, rest)?;
            Ok((Frame::Stream(frame), rest))
        }
        0x10 => {
            let (frame, rest) = flow_control::parse_max_data(rest)?;
            Ok((Frame::MaxData(frame), rest))
        }
        0x11 => {
            let (frame, rest) = flow_control::parse_max_stream_data(rest)?;
            Ok((Frame::MaxStreamData(frame), rest))
        }
        0x12 | 0x13 => {
            let (frame, rest) = flow_control::parse_max_streams(rest)?;
            Ok((
                Frame::MaxStreams {
                    bidirectional: tag == 0x12,
                    frame,
                },
                rest,
            ))
        }
        0x14 => {
            let (frame, rest) = flow_control::parse_data_blocked(rest)?;
            Ok((Frame::DataBlocked(frame), rest))
        }
        0x15 => {
            let (frame, rest) = flow_control::parse_stream_data_blocked(rest)?;
            Ok((Frame::StreamDataBlocked(frame), rest))
        }
        0x16 | 0x17 => {
            let (frame, rest) = flow_control::parse_streams_blocked(rest)?;
            Ok((
                Frame::StreamsBlocked {
                    bidirectional: tag == 0x16,
                    frame,
                },
                rest,
            ))
        }
        0x18 => {
            let (frame, rest) = connection_id::parse_new_connection_id(rest)?;
            Ok((Frame::NewConnectionId(frame), rest))
        }
        0x19 => {
            let (frame, rest) = connection_id::parse_retire_connection_id(rest)?;
            Ok((Frame::RetireConnectionId(frame), rest))
        }
        0x1a => {
            let (frame, rest) = path::parse_path_challenge(rest)?;
            Ok((Frame::PathChallenge(frame), rest))
        }
        0x1b => {
            let (frame, rest) = path::parse_path_response(rest)?;
            Ok((Frame::PathResponse(frame), rest))
        }
        0x1c | 0x1d => {
            let (frame, rest) = connection_close::parse(tag as u8, rest)?;
            Ok((Frame::ConnectionClose(frame), rest))
        }
        0x1e => Ok((Frame::HandshakeDone, rest)),
        _ => unreachable!("permission_mask returned nonzero for an undispatched tag"),
    }
}

impl Frame<'_> {
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::Padding(frame) => frame.encoded_len(),
            Frame::Ping => 1,
            Frame::Ack(ack) => ack.encoded_len(),
            Frame::ResetStream(frame) => frame.encoded_len(),
            Frame::StopSending(frame) => frame.encoded_len(),
            Frame::Crypto(frame) => frame.encoded_len(),
            Frame::NewToken(frame) => frame.encoded_len(),
            Frame::Stream(frame) => frame.encoded_len(),
            Frame::MaxData(frame) => frame.encoded_len(),
            Frame::MaxStreamData(frame) => frame.encoded_len(),
            Frame::MaxStreams { frame, .. } => frame.encoded_len(),
            Frame::DataBlocked(frame) => frame.encoded_len(),
            Frame::StreamDataBlocked(frame) => frame.encoded_len(),
            Frame::StreamsBlocked { frame, .. } => frame.encoded_len(),
            Frame::NewConnectionId(frame) => frame.encoded_len(),
            Frame::RetireConnectionId(frame) => frame.encoded_len(),
            Frame::PathChallenge(frame) => frame.encoded_len(),
            Frame::PathResponse(frame) => frame.encoded_len(),
            Frame::ConnectionClose(close) => {
                if close.is_application {
                    connection_close::ApplicationClose {
                        error_code: close.error_code,
                        reason_phrase: close.reason_phrase,
                    }
                    .encoded_len()
                } else {
                    connection_close::TransportClose {
                        error_code: close.error_code,
                        frame_type: close.frame_type,
                        reason_phrase: close.reason_phrase,
                    }
                    .encoded_len()
                }
            }
            Frame::HandshakeDone => 1,
        }
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        match self {
            Frame::Padding(frame) => frame.encode(buffer),
            Frame::Ping => buffer.write_u8(misc::PING_TAG),
            Frame::Ack(ack) => ack.encode(buffer),
            Frame::ResetStream(frame) => frame.encode(buffer),
            Frame::StopSending(frame) => frame.encode(buffer),
            Frame::Crypto(frame) => frame.encode(buffer),
            Frame::NewToken(frame) => frame.encode(buffer),
            Frame::Stream(frame) => frame.encode(buffer),
            Frame::MaxData(frame) => frame.encode(buffer),
            Frame::MaxStreamData(frame) => frame.encode(buffer),
            Frame::MaxStreams { bidirectional, frame } => frame.encode(
                if *bidirectional {
                    flow_control::MAX_STREAMS_BIDI_TAG
                } else {
                    flow_control::MAX_STREAMS_UNI_TAG
                },
                buffer,
            ),
            Frame::DataBlocked(frame) => frame.encode(buffer),
            Frame::StreamDataBlocked(frame) => frame.encode(buffer),
            Frame::StreamsBlocked { bidirectional, frame } => frame.encode(
                if *bidirectional {
                    flow_control::STREAMS_BLOCKED_BIDI_TAG
                } else {
                    flow_control::STREAMS_BLOCKED_UNI_TAG
                },
                buffer,
            ),
            Frame::NewConnectionId(frame) => frame.encode(buffer),
            Frame::RetireConnectionId(frame) => frame.encode(buffer),
            Frame::PathChallenge(frame) => frame.encode(buffer),
            Frame::PathResponse(frame) => frame.encode(buffer),
            Frame::ConnectionClose(close) => {
                if close.is_application {
                    connection_close::ApplicationClose {
                        error_code: close.error_code,
                        reason_phrase: close.reason_phrase,
                    }
                    .encode(buffer)
                } else {
                    connection_close::TransportClose {
                        error_code: close.error_code,
                        frame_type: close.frame_type,
                        reason_phrase: close.reason_phrase,
                    }
                    .encode(buffer)
                }
            }
            Frame::HandshakeDone => buffer.write_u8(misc::HANDSHAKE_DONE_TAG),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_permitted_everywhere_ack_not_in_zero_rtt() {
        let ping = Frame::Ping;
        for level in [
            EncryptionLevel::Initial,
            EncryptionLevel::Handshake,
            EncryptionLevel::ZeroRtt,
            EncryptionLevel::Application,
        ] {
            assert!(ping.permitted_at(level));
        }

        let ack = Frame::Ack(Ack {
            largest_acknowledged: VarInt::ZERO,
            ack_delay: VarInt::ZERO,
            first_ack_range: VarInt::ZERO,
            ack_ranges: &[],
            ecn_counts: None,
        });
        assert!(ack.permitted_at(EncryptionLevel::Initial));
        assert!(ack.permitted_at(EncryptionLevel::Handshake));
        assert!(!ack.permitted_at(EncryptionLevel::ZeroRtt));
        assert!(ack.permitted_at(EncryptionLevel::Application));
    }

    #[test]
    fn stream_only_in_zero_rtt_and_application() {
        let stream = Frame::Stream(Stream {
            stream_id: VarInt::ZERO,
            offset: VarInt::ZERO,
            fin: false,
            data: &[],
        });
        assert!(!stream.permitted_at(EncryptionLevel::Initial));
        assert!(!stream.permitted_at(EncryptionLevel::Handshake));
        assert!(stream.permitted_at(EncryptionLevel::ZeroRtt));
        assert!(stream.permitted_at(EncryptionLevel::Application));
    }

    #[test]
    fn disallowed_frame_at_level_is_protocol_violation() {
        let bytes = [stream::STREAM_TAG_BASE, 0x00];
        let result = parse_frame(DecoderBuffer::new(&bytes), EncryptionLevel::Initial);
        assert!(matches!(
            result,
            Err(crate::error::CodecError::Error(e)) if e.code == crate::error::PROTOCOL_VIOLATION
        ));
    }

    #[test]
    fn new_token_and_handshake_done_never_permitted_on_receive() {
        let new_token = Frame::NewToken(stream::NewToken { token: &[] });
        let handshake_done = Frame::HandshakeDone;
        for level in [
            EncryptionLevel::Initial,
            EncryptionLevel::Handshake,
            EncryptionLevel::ZeroRtt,
            EncryptionLevel::Application,
        ] {
            assert!(!new_token.permitted_at(level));
            assert!(!handshake_done.permitted_at(level));
        }

        let bytes = [stream::NEW_TOKEN_TAG, 0x00];
        let result = parse_frame(DecoderBuffer::new(&bytes), EncryptionLevel::Application);
        assert!(matches!(
            result,
            Err(crate::error::CodecError::Error(e)) if e.code == crate::error::PROTOCOL_VIOLATION
        ));
    }

    #[test]
    fn ack_eliciting_excludes_ack_padding_and_close() {
        assert!(!Frame::Padding(Padding { len: 1 }).is_ack_eliciting());
        assert!(Frame::Ping.is_ack_eliciting());
        assert!(Frame::HandshakeDone.is_ack_eliciting());
    }

    #[test]
    fn round_trips_connection_close_app_form() {
        let close = Frame::ConnectionClose(ConnectionClose {
            error_code: VarInt::try_from(5u64).unwrap(),
            is_application: true,
            frame_type: VarInt::ZERO,
            reason_phrase: b"bye",
        });
        assert_eq!(close.tag(), connection_close::APPLICATION_ERROR_TAG);
        let mut out = vec![0u8; close.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        close.encode(&mut buffer).unwrap();
        assert_eq!(out[0], connection_close::APPLICATION_ERROR_TAG);
    }
}
