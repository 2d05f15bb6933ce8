//! Transport error catalog (RFC 9000 §20.1) and the two parse outcomes
//! (`DECLINED` / `ERROR`) every entry point in this crate returns.
//!
//! The codec never panics on malformed input; every failure path returns
//! [`CodecError`] instead.

use crate::varint::VarInt;
use core::fmt;
use qcodec_buffer::DecoderError;

/// Error codes `>= CRYPTO_ERROR_BASE` carry a TLS alert in their low byte
/// and all map to the same "handshake error" name.
pub const CRYPTO_ERROR_BASE: u64 = 0x100;

macro_rules! def_error {
    ($name:ident, $code:expr) => {
        pub const $name: VarInt = VarInt::from_u64_const($code);
    };
}

impl VarInt {
    #[inline]
    const fn from_u64_const(value: u64) -> VarInt {
        // all named transport error codes are well under the varint range,
        // so a checked `new` would only ever succeed here; this avoids
        // threading `Result` through every constant definition below.
        match VarInt::new(value) {
            Ok(v) => v,
            Err(_) => panic!("transport error constant out of varint range"),
        }
    }
}

def_error!(NO_ERROR, 0x00);
def_error!(INTERNAL_ERROR, 0x01);
def_error!(CONNECTION_REFUSED, 0x02);
def_error!(FLOW_CONTROL_ERROR, 0x03);
def_error!(STREAM_LIMIT_ERROR, 0x04);
def_error!(STREAM_STATE_ERROR, 0x05);
def_error!(FINAL_SIZE_ERROR, 0x06);
def_error!(FRAME_ENCODING_ERROR, 0x07);
def_error!(TRANSPORT_PARAMETER_ERROR, 0x08);
def_error!(CONNECTION_ID_LIMIT_ERROR, 0x09);
def_error!(PROTOCOL_VIOLATION, 0x0A);
def_error!(INVALID_TOKEN, 0x0B);
def_error!(APPLICATION_ERROR, 0x0C);
def_error!(CRYPTO_BUFFER_EXCEEDED, 0x0D);
def_error!(KEY_UPDATE_ERROR, 0x0E);
def_error!(AEAD_LIMIT_REACHED, 0x0F);
def_error!(NO_VIABLE_PATH, 0x10);

const NAMED_ERRORS: &[(u64, &str)] = &[
    (0x00, "NO_ERROR"),
    (0x01, "INTERNAL_ERROR"),
    (0x02, "CONNECTION_REFUSED"),
    (0x03, "FLOW_CONTROL_ERROR"),
    (0x04, "STREAM_LIMIT_ERROR"),
    (0x05, "STREAM_STATE_ERROR"),
    (0x06, "FINAL_SIZE_ERROR"),
    (0x07, "FRAME_ENCODING_ERROR"),
    (0x08, "TRANSPORT_PARAMETER_ERROR"),
    (0x09, "CONNECTION_ID_LIMIT_ERROR"),
    (0x0A, "PROTOCOL_VIOLATION"),
    (0x0B, "INVALID_TOKEN"),
    (0x0C, "APPLICATION_ERROR"),
    (0x0D, "CRYPTO_BUFFER_EXCEEDED"),
    (0x0E, "KEY_UPDATE_ERROR"),
    (0x0F, "AEAD_LIMIT_REACHED"),
    (0x10, "NO_VIABLE_PATH"),
];

/// Builds the error code signaling a TLS alert of `alert` during the
/// handshake: `0x100 | alert`.
#[inline]
pub fn crypto_error(alert: u8) -> VarInt {
    VarInt::from_u64_const(CRYPTO_ERROR_BASE | alert as u64)
}

/// Maps a transport error code to its human-readable name, per the
/// contiguous-table-then-sentinel scheme of §20.1: named codes up to
/// `NO_VIABLE_PATH`, then "unknown error" up to `CRYPTO_ERROR_BASE`, then a
/// single "handshake error" sentinel for every crypto alert code.
pub fn error_name(code: VarInt) -> &'static str {
    let code = code.as_u64();
    if code >= CRYPTO_ERROR_BASE {
        return "handshake error (tls alert)";
    }
    match NAMED_ERRORS.iter().find(|(c, _)| *c == code) {
        Some((_, name)) => name,
        None => "unknown error",
    }
}

/// A QUIC transport-level error: a code, the frame type that triggered it
/// (if known), and a static diagnostic reason.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransportError {
    pub code: VarInt,
    pub frame_type: Option<VarInt>,
    pub reason: &'static str,
}

impl TransportError {
    #[inline]
    pub const fn new(code: VarInt, reason: &'static str) -> Self {
        Self {
            code,
            frame_type: None,
            reason,
        }
    }

    #[inline]
    pub const fn with_frame_type(mut self, frame_type: VarInt) -> Self {
        self.frame_type = Some(frame_type);
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", error_name(self.code), self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

/// Builds a [`TransportError`] with a literal reason, the way a connection
/// collaborator would construct one to hand off to CONNECTION_CLOSE.
#[macro_export]
macro_rules! transport_error {
    ($code:expr, $reason:expr) => {
        $crate::error::TransportError::new($code, $reason)
    };
    ($code:expr, $reason:expr, frame_type: $frame_type:expr) => {
        $crate::error::TransportError::new($code, $reason).with_frame_type($frame_type)
    };
}

/// The two failure outcomes a parse entry point can return (§7): the input
/// was never this codec's to handle, or it looked like its business but
/// failed validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecError {
    /// Not this codec's business: wrong fixed bit, unsupported packet form,
    /// a too-small Initial datagram. The caller may drop silently or
    /// respond with version negotiation.
    Declined,
    /// A well-formed-looking packet or frame failed validation.
    Error(TransportError),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl From<TransportError> for CodecError {
    #[inline]
    fn from(error: TransportError) -> Self {
        CodecError::Error(error)
    }
}

/// Every bounds failure the primitive/varint codec can produce is, from the
/// frame/packet layer's point of view, a truncated or malformed field --
/// FRAME_ENCODING_ERROR.
impl From<DecoderError> for CodecError {
    #[inline]
    fn from(error: DecoderError) -> Self {
        let reason = match error {
            DecoderError::UnexpectedEof(_) => "field truncated before end of input",
            DecoderError::UnexpectedBytes(_) => "unexpected trailing bytes",
            DecoderError::LengthCapacityExceeded => "length prefix exceeds buffer capacity",
            DecoderError::InvariantViolation(msg) => msg,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(reason, "primitive codec failure surfaced as FRAME_ENCODING_ERROR");
        CodecError::Error(TransportError::new(FRAME_ENCODING_ERROR, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_codes_resolve() {
        assert_eq!(error_name(PROTOCOL_VIOLATION), "PROTOCOL_VIOLATION");
        assert_eq!(error_name(NO_ERROR), "NO_ERROR");
    }

    #[test]
    fn unnamed_transport_code_is_unknown() {
        assert_eq!(error_name(VarInt::new(0x20).unwrap()), "unknown error");
    }

    #[test]
    fn crypto_codes_are_a_single_sentinel() {
        assert_eq!(error_name(crypto_error(40)), "handshake error (tls alert)");
        assert_eq!(error_name(crypto_error(0)), "handshake error (tls alert)");
    }
}
