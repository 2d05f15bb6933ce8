//! QUIC transport parameters (RFC 9000 §18.2): a sequence of
//! `id (varint) | length (varint) | value (length bytes)` tuples exchanged
//! during the TLS handshake.
//!
//! Unknown IDs are skipped, not rejected — per §18.1, an endpoint "MUST
//! ignore transport parameters that it does not understand." A handful of
//! parameters only the server may legitimately send; receiving one from a
//! client is a `TRANSPORT_PARAMETER_ERROR`, which this module enforces via
//! the `Sender` the caller asserts the parameter set came from.

use crate::error::{CodecError, CodecResult, TransportError, TRANSPORT_PARAMETER_ERROR};
use crate::varint::VarInt;
use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

const ORIGINAL_DESTINATION_CONNECTION_ID: u64 = 0x00;
const MAX_IDLE_TIMEOUT: u64 = 0x01;
const STATELESS_RESET_TOKEN: u64 = 0x02;
const MAX_UDP_PAYLOAD_SIZE: u64 = 0x03;
const INITIAL_MAX_DATA: u64 = 0x04;
const INITIAL_MAX_STREAM_DATA_BIDI_LOCAL: u64 = 0x05;
const INITIAL_MAX_STREAM_DATA_BIDI_REMOTE: u64 = 0x06;
const INITIAL_MAX_STREAM_DATA_UNI: u64 = 0x07;
const INITIAL_MAX_STREAMS_BIDI: u64 = 0x08;
const INITIAL_MAX_STREAMS_UNI: u64 = 0x09;
const ACK_DELAY_EXPONENT: u64 = 0x0a;
const MAX_ACK_DELAY: u64 = 0x0b;
const DISABLE_ACTIVE_MIGRATION: u64 = 0x0c;
const PREFERRED_ADDRESS: u64 = 0x0d;
const ACTIVE_CONNECTION_ID_LIMIT: u64 = 0x0e;
const INITIAL_SOURCE_CONNECTION_ID: u64 = 0x0f;
const RETRY_SOURCE_CONNECTION_ID: u64 = 0x10;

pub const STATELESS_RESET_TOKEN_LEN: usize = 16;

/// §18.2's default for `ack_delay_exponent` when the parameter is absent.
pub const DEFAULT_ACK_DELAY_EXPONENT: u64 = 3;
/// §18.2's default for `max_ack_delay` when the parameter is absent, in
/// milliseconds.
pub const DEFAULT_MAX_ACK_DELAY_MS: u64 = 25;
/// §18.2's default for `active_connection_id_limit` when the parameter is
/// absent.
pub const DEFAULT_ACTIVE_CONNECTION_ID_LIMIT: u64 = 2;

/// Which peer a parsed parameter set was sent by — needed to enforce the
/// handful of parameters only a server may send.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sender {
    Client,
    Server,
}

/// A fully decoded transport parameter set. `preferred_address` is kept as
/// an opaque slice (its internal layout is a connection-migration concern
/// out of this codec's scope); everything else is either a scalar or a
/// connection-ID-shaped byte slice.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportParameters<'a> {
    pub original_destination_connection_id: Option<&'a [u8]>,
    pub max_idle_timeout: Option<VarInt>,
    pub stateless_reset_token: Option<&'a [u8; STATELESS_RESET_TOKEN_LEN]>,
    pub max_udp_payload_size: Option<VarInt>,
    pub initial_max_data: Option<VarInt>,
    pub initial_max_stream_data_bidi_local: Option<VarInt>,
    pub initial_max_stream_data_bidi_remote: Option<VarInt>,
    pub initial_max_stream_data_uni: Option<VarInt>,
    pub initial_max_streams_bidi: Option<VarInt>,
    pub initial_max_streams_uni: Option<VarInt>,
    pub ack_delay_exponent: Option<VarInt>,
    pub max_ack_delay: Option<VarInt>,
    pub disable_active_migration: bool,
    pub preferred_address: Option<&'a [u8]>,
    pub active_connection_id_limit: Option<VarInt>,
    pub initial_source_connection_id: Option<&'a [u8]>,
    pub retry_source_connection_id: Option<&'a [u8]>,
}

fn forbidden_for_client(id: u64) -> bool {
    matches!(
        id,
        ORIGINAL_DESTINATION_CONNECTION_ID | STATELESS_RESET_TOKEN | PREFERRED_ADDRESS | RETRY_SOURCE_CONNECTION_ID
    )
}

fn varint_error() -> CodecError {
    TransportError::new(TRANSPORT_PARAMETER_ERROR, "malformed varint-valued transport parameter").into()
}

/// A record boundary failed to decode: either a truncated id/length/value
/// triple, or -- since the loop below always tries to read one more triple
/// out of whatever bytes remain -- a stray trailing byte after the last
/// well-formed parameter. Both are `TRANSPORT_PARAMETER_ERROR`, not the
/// primitive codec's default `FRAME_ENCODING_ERROR` mapping.
fn record_decode_error() -> CodecError {
    TransportError::new(TRANSPORT_PARAMETER_ERROR, "truncated or trailing transport parameter bytes").into()
}

/// Parses a complete transport parameter sequence from `buffer`, which must
/// contain exactly the parameters and nothing else (this codec has no
/// notion of a length prefix around the whole sequence; that lives in the
/// TLS extension framing, out of scope here). A stray byte left over after
/// the last complete record -- or a truncated record -- is rejected with
/// `TRANSPORT_PARAMETER_ERROR`.
pub fn parse<'a>(sender: Sender, mut buffer: DecoderBuffer<'a>) -> CodecResult<TransportParameters<'a>> {
    let mut params = TransportParameters::default();

    while !buffer.is_empty() {
        let (id, rest) = VarInt::decode(buffer).map_err(|_| record_decode_error())?;
        let id = id.as_u64();
        let (value, rest) =
            crate::varint::decode_slice_with_varint_len(rest).map_err(|_| record_decode_error())?;

        if sender == Sender::Client && forbidden_for_client(id) {
            return Err(TransportError::new(
                TRANSPORT_PARAMETER_ERROR,
                "client sent a server-only transport parameter",
            )
            .into());
        }

        match id {
            ORIGINAL_DESTINATION_CONNECTION_ID => params.original_destination_connection_id = Some(value),
            MAX_IDLE_TIMEOUT => params.max_idle_timeout = Some(decode_varint_value(value)?),
            STATELESS_RESET_TOKEN => {
                let token: &[u8; STATELESS_RESET_TOKEN_LEN] =
                    value.try_into().map_err(|_| {
                        TransportError::new(TRANSPORT_PARAMETER_ERROR, "stateless_reset_token is not 16 bytes").into()
                            as CodecError
                    })?;
                params.stateless_reset_token = Some(token);
            }
            MAX_UDP_PAYLOAD_SIZE => params.max_udp_payload_size = Some(decode_varint_value(value)?),
            INITIAL_MAX_DATA => params.initial_max_data = Some(decode_varint_value(value)?),
            INITIAL_MAX_STREAM_DATA_BIDI_LOCAL => {
                params.initial_max_stream_data_bidi_local = Some(decode_varint_value(value)?)
            }
            INITIAL_MAX_STREAM_DATA_BIDI_REMOTE => {
                params.initial_max_stream_data_bidi_remote = Some(decode_varint_value(value)?)
            }
            INITIAL_MAX_STREAM_DATA_UNI => params.initial_max_stream_data_uni = Some(decode_varint_value(value)?),
            INITIAL_MAX_STREAMS_BIDI => params.initial_max_streams_bidi = Some(decode_varint_value(value)?),
            INITIAL_MAX_STREAMS_UNI => params.initial_max_streams_uni = Some(decode_varint_value(value)?),
            ACK_DELAY_EXPONENT => params.ack_delay_exponent = Some(decode_varint_value(value)?),
            MAX_ACK_DELAY => params.max_ack_delay = Some(decode_varint_value(value)?),
            DISABLE_ACTIVE_MIGRATION => params.disable_active_migration = true,
            PREFERRED_ADDRESS => params.preferred_address = Some(value),
            ACTIVE_CONNECTION_ID_LIMIT => params.active_connection_id_limit = Some(decode_varint_value(value)?),
            INITIAL_SOURCE_CONNECTION_ID => params.initial_source_connection_id = Some(value),
            RETRY_SOURCE_CONNECTION_ID => params.retry_source_connection_id = Some(value),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(parameter_id = id, "ignoring unknown transport parameter");
            }
        }

        buffer = rest;
    }

    Ok(params)
}

fn decode_varint_value(value: &[u8]) -> CodecResult<VarInt> {
    let (decoded, rest) = VarInt::decode(DecoderBuffer::new(value)).map_err(|_| varint_error())?;
    if !rest.is_empty() {
        return Err(varint_error());
    }
    Ok(decoded)
}

fn encode_varint_param(buffer: &mut EncoderBuffer<'_>, id: u64, value: VarInt) -> Result<(), EncoderError> {
    VarInt::try_from(id).expect("transport parameter ids fit a varint").encode(buffer)?;
    VarInt::try_from(value.encoding_size() as u64)
        .expect("a varint's own encoding size fits a varint")
        .encode(buffer)?;
    value.encode(buffer)
}

fn encode_bytes_param(buffer: &mut EncoderBuffer<'_>, id: u64, value: &[u8]) -> Result<(), EncoderError> {
    VarInt::try_from(id).expect("transport parameter ids fit a varint").encode(buffer)?;
    crate::varint::encode_slice_with_varint_len(buffer, value)
}

fn varint_param_len(id: u64, value: VarInt) -> usize {
    let id_len = VarInt::try_from(id).expect("transport parameter ids fit a varint").encoding_size();
    let len_len = VarInt::try_from(value.encoding_size() as u64)
        .expect("a varint's own encoding size fits a varint")
        .encoding_size();
    id_len + len_len + value.encoding_size()
}

fn bytes_param_len(id: u64, value: &[u8]) -> usize {
    let id_len = VarInt::try_from(id).expect("transport parameter ids fit a varint").encoding_size();
    let len_len = VarInt::try_from(value.len() as u64)
        .expect("transport parameter values fit a varint length")
        .encoding_size();
    id_len + len_len + value.len()
}

impl TransportParameters<'_> {
    /// Total encoded length of every parameter currently set to `Some` (or,
    /// for `disable_active_migration`, `true`).
    pub fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(v) = self.original_destination_connection_id {
            len += bytes_param_len(ORIGINAL_DESTINATION_CONNECTION_ID, v);
        }
        if let Some(v) = self.max_idle_timeout {
            len += varint_param_len(MAX_IDLE_TIMEOUT, v);
        }
        if let Some(v) = self.stateless_reset_token {
            len += bytes_param_len(STATELESS_RESET_TOKEN, v);
        }
        if let Some(v) = self.max_udp_payload_size {
            len += varint_param_len(MAX_UDP_PAYLOAD_SIZE, v);
        }
        if let Some(v) = self.initial_max_data {
            len += varint_param_len(INITIAL_MAX_DATA, v);
        }
        if let Some(v) = self.initial_max_stream_data_bidi_local {
            len += varint_param_len(INITIAL_MAX_STREAM_DATA_BIDI_LOCAL, v);
        }
        if let Some(v) = self.initial_max_stream_data_bidi_remote {
            len += varint_param_len(INITIAL_MAX_STREAM_DATA_BIDI_REMOTE, v);
        }
        if let Some(v) = self.initial_max_stream_data_uni {
            len += varint_param_len(INITIAL_MAX_STREAM_DATA_UNI, v);
        }
        if let Some(v) = self.initial_max_streams_bidi {
            len += varint_param_len(INITIAL_MAX_STREAMS_BIDI, v);
        }
        if let Some(v) = self.initial_max_streams_uni {
            len += varint_param_len(INITIAL_MAX_STREAMS_UNI, v);
        }
        if let Some(v) = self.ack_delay_exponent {
            len += varint_param_len(ACK_DELAY_EXPONENT, v);
        }
        if let Some(v) = self.max_ack_delay {
            len += varint_param_len(MAX_ACK_DELAY, v);
        }
        if self.disable_active_migration {
            len += bytes_param_len(DISABLE_ACTIVE_MIGRATION, &[]);
        }
        if let Some(v) = self.preferred_address {
            len += bytes_param_len(PREFERRED_ADDRESS, v);
        }
        if let Some(v) = self.active_connection_id_limit {
            len += varint_param_len(ACTIVE_CONNECTION_ID_LIMIT, v);
        }
        if let Some(v) = self.initial_source_connection_id {
            len += bytes_param_len(INITIAL_SOURCE_CONNECTION_ID, v);
        }
        if let Some(v) = self.retry_source_connection_id {
            len += bytes_param_len(RETRY_SOURCE_CONNECTION_ID, v);
        }
        len
    }

    /// Writes every `Some`/`true` field, in ascending ID order. This fixed
    /// emission order is an implementation choice (§18.1 does not mandate
    /// one); see the grounding ledger for the alternative considered.
    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        if let Some(v) = self.original_destination_connection_id {
            encode_bytes_param(buffer, ORIGINAL_DESTINATION_CONNECTION_ID, v)?;
        }
        if let Some(v) = self.max_idle_timeout {
            encode_varint_param(buffer, MAX_IDLE_TIMEOUT, v)?;
        }
        if let Some(v) = self.stateless_reset_token {
            encode_bytes_param(buffer, STATELESS_RESET_TOKEN, v)?;
        }
        if let Some(v) = self.max_udp_payload_size {
            encode_varint_param(buffer, MAX_UDP_PAYLOAD_SIZE, v)?;
        }
        if let Some(v) = self.initial_max_data {
            encode_varint_param(buffer, INITIAL_MAX_DATA, v)?;
        }
        if let Some(v) = self.initial_max_stream_data_bidi_local {
            encode_varint_param(buffer, INITIAL_MAX_STREAM_DATA_BIDI_LOCAL, v)?;
        }
        if let Some(v) = self.initial_max_stream_data_bidi_remote {
            encode_varint_param(buffer, INITIAL_MAX_STREAM_DATA_BIDI_REMOTE, v)?;
        }
        if let Some(v) = self.initial_max_stream_data_uni {
            encode_varint_param(buffer, INITIAL_MAX_STREAM_DATA_UNI, v)?;
        }
        if let Some(v) = self.initial_max_streams_bidi {
            encode_varint_param(buffer, INITIAL_MAX_STREAMS_BIDI, v)?;
        }
        if let Some(v) = self.initial_max_streams_uni {
            encode_varint_param(buffer, INITIAL_MAX_STREAMS_UNI, v)?;
        }
        if let Some(v) = self.ack_delay_exponent {
            encode_varint_param(buffer, ACK_DELAY_EXPONENT, v)?;
        }
        if let Some(v) = self.max_ack_delay {
            encode_varint_param(buffer, MAX_ACK_DELAY, v)?;
        }
        if self.disable_active_migration {
            encode_bytes_param(buffer, DISABLE_ACTIVE_MIGRATION, &[])?;
        }
        if let Some(v) = self.preferred_address {
            encode_bytes_param(buffer, PREFERRED_ADDRESS, v)?;
        }
        if let Some(v) = self.active_connection_id_limit {
            encode_varint_param(buffer, ACTIVE_CONNECTION_ID_LIMIT, v)?;
        }
        if let Some(v) = self.initial_source_connection_id {
            encode_bytes_param(buffer, INITIAL_SOURCE_CONNECTION_ID, v)?;
        }
        if let Some(v) = self.retry_source_connection_id {
            encode_bytes_param(buffer, RETRY_SOURCE_CONNECTION_ID, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s6_example() {
        let mut params = TransportParameters::default();
        params.initial_max_data = Some(VarInt::try_from(100u64).unwrap());
        params.initial_max_streams_bidi = Some(VarInt::try_from(4u64).unwrap());
        params.disable_active_migration = true;

        let mut out = vec![0u8; params.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        params.encode(&mut buffer).unwrap();

        let parsed = parse(Sender::Server, DecoderBuffer::new(&out)).unwrap();
        assert_eq!(parsed.initial_max_data, params.initial_max_data);
        assert_eq!(parsed.initial_max_streams_bidi, params.initial_max_streams_bidi);
        assert!(parsed.disable_active_migration);
    }

    #[test]
    fn unknown_parameter_id_is_skipped() {
        let mut out = vec![];
        let mut buf = [0u8; 16];
        let mut encoder = EncoderBuffer::new(&mut buf);
        VarInt::try_from(0x4242u64).unwrap().encode(&mut encoder).unwrap();
        crate::varint::encode_slice_with_varint_len(&mut encoder, b"ignored").unwrap();
        out.extend_from_slice(&buf[..encoder.len()]);

        let parsed = parse(Sender::Server, DecoderBuffer::new(&out)).unwrap();
        assert!(parsed.initial_max_data.is_none());
    }

    #[test]
    fn trailing_byte_after_parameters_is_rejected() {
        let mut params = TransportParameters::default();
        params.initial_max_data = Some(VarInt::try_from(100u64).unwrap());

        let mut out = vec![0u8; params.encoded_len() + 1];
        let mut buffer = EncoderBuffer::new(&mut out);
        params.encode(&mut buffer).unwrap();
        // one stray byte left dangling after the last complete record
        out[params.encoded_len()] = 0xff;

        assert!(matches!(
            parse(Sender::Server, DecoderBuffer::new(&out)),
            Err(CodecError::Error(e)) if e.code == TRANSPORT_PARAMETER_ERROR
        ));
    }

    #[test]
    fn client_sending_server_only_parameter_is_rejected() {
        let mut out = vec![];
        let mut buf = [0u8; 16];
        let mut encoder = EncoderBuffer::new(&mut buf);
        VarInt::try_from(STATELESS_RESET_TOKEN).unwrap().encode(&mut encoder).unwrap();
        crate::varint::encode_slice_with_varint_len(&mut encoder, &[0u8; STATELESS_RESET_TOKEN_LEN]).unwrap();
        out.extend_from_slice(&buf[..encoder.len()]);

        assert!(matches!(
            parse(Sender::Client, DecoderBuffer::new(&out)),
            Err(CodecError::Error(e)) if e.code == TRANSPORT_PARAMETER_ERROR
        ));
    }
}
