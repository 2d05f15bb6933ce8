use core::fmt;

/// Reasons a [`crate::DecoderBuffer`] read can fail.
///
/// None of these are raised by panicking; every read that could run past
/// the end of the buffer returns one of these instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecoderError {
    /// The buffer ended before the requested number of bytes could be read.
    UnexpectedEof(usize),
    /// The buffer contained enough bytes but their contents were rejected.
    UnexpectedBytes(usize),
    /// A length-prefixed field claimed a length this buffer cannot hold.
    LengthCapacityExceeded,
    /// A field-level invariant (not just a bounds check) was violated.
    InvariantViolation(&'static str),
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof(len) => write!(f, "unexpected eof, needed {len} more bytes"),
            Self::UnexpectedBytes(offset) => write!(f, "unexpected bytes at offset {offset}"),
            Self::LengthCapacityExceeded => write!(f, "length prefix exceeds buffer capacity"),
            Self::InvariantViolation(msg) => write!(f, "invariant violated: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecoderError {}

/// Reasons an [`crate::EncoderBuffer`] write can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncoderError {
    /// The output buffer is too small to hold the remaining bytes.
    UnexpectedEnd(usize),
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd(len) => write!(f, "output buffer too small, needed {len} more bytes"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncoderError {}

/// Asserts a decoder-level invariant, returning `Err(InvariantViolation)` instead of panicking.
#[macro_export]
macro_rules! decoder_invariant {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::DecoderError::InvariantViolation($msg));
        }
    };
}
