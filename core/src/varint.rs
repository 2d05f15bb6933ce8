//! QUIC variable-length integer (RFC 9000 §16).
//!
//! The top two bits of the first byte select a length class: `00` → 1 byte,
//! `01` → 2, `10` → 4, `11` → 8. The remaining bits of those bytes, read
//! big-endian, are the value. A decoder must accept any length class that
//! can hold the value, not just the minimal one — `VarInt::decode` does not
//! reject a 151288809941952652-style value encoded in 8 bytes even though a
//! smaller class could not have held it anyway, and likewise accepts small
//! values encoded in a longer-than-necessary class.

use core::fmt;
use qcodec_buffer::{DecoderBuffer, DecoderBufferResult, DecoderError, EncoderBuffer, EncoderError};

/// The largest value a QUIC varint can hold: `2^62 - 1`.
pub const MAX_VARINT_VALUE: u64 = (1 << 62) - 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VarIntError;

impl fmt::Display for VarIntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value exceeds the varint range of 2^62 - 1")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VarIntError {}

/// A QUIC varint: an unsigned integer in `[0, 2^62 - 1]`.
#[derive(Clone, Copy, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct VarInt(u64);

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarInt({})", self.0)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl VarInt {
    pub const ZERO: VarInt = VarInt(0);
    pub const MAX: VarInt = VarInt(MAX_VARINT_VALUE);

    #[inline]
    pub const fn new(value: u64) -> Result<Self, VarIntError> {
        if value > MAX_VARINT_VALUE {
            Err(VarIntError)
        } else {
            Ok(Self(value))
        }
    }

    /// Builds a `VarInt` without range-checking. Only used internally where
    /// the value is already known to fit, e.g. after masking a decoded
    /// value down to 62 bits.
    #[inline]
    const fn new_truncated(value: u64) -> Self {
        Self(value & MAX_VARINT_VALUE)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn checked_add(self, other: VarInt) -> Option<VarInt> {
        self.0.checked_add(other.0).and_then(|v| VarInt::new(v).ok())
    }

    #[inline]
    pub fn checked_sub(self, other: VarInt) -> Option<VarInt> {
        self.0.checked_sub(other.0).map(VarInt)
    }

    /// The length class (1, 2, 4, or 8 bytes) this value would be encoded
    /// in by `encode`, i.e. the smallest `L` with `value < 2^(8L-2)`.
    #[inline]
    pub fn encoding_size(self) -> usize {
        encoding_size_of(self.0)
    }

    #[inline]
    pub fn decode(buffer: DecoderBuffer<'_>) -> DecoderBufferResult<'_, VarInt> {
        let first = buffer
            .peek_byte(0)
            .ok_or(DecoderError::UnexpectedEof(1))?;
        let len = 1usize << (first >> 6);
        match len {
            1 => {
                let (value, buffer) = buffer.decode_u8()?;
                Ok((VarInt::new_truncated(value as u64), buffer))
            }
            2 => {
                let (value, buffer) = buffer.decode_u16()?;
                Ok((VarInt::new_truncated(value as u64), buffer))
            }
            4 => {
                let (value, buffer) = buffer.decode_u32()?;
                Ok((VarInt::new_truncated(value as u64), buffer))
            }
            _ => {
                let (value, buffer) = buffer.decode_u64()?;
                Ok((VarInt::new_truncated(value), buffer))
            }
        }
    }

    #[inline]
    pub fn encode(self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        match self.encoding_size() {
            1 => buffer.write_u8(self.0 as u8),
            2 => buffer.write_u16(0x4000 | self.0 as u16),
            4 => buffer.write_u32(0x8000_0000 | self.0 as u32),
            _ => buffer.write_u64(0xC000_0000_0000_0000 | self.0),
        }
    }
}

/// Decodes a varint-length-prefixed byte slice, as used by Token, CRYPTO
/// data length-adjacent fields, and CONNECTION_CLOSE's reason phrase.
#[inline]
pub fn decode_slice_with_varint_len<'a>(
    buffer: DecoderBuffer<'a>,
) -> DecoderBufferResult<'a, &'a [u8]> {
    let (len, buffer) = VarInt::decode(buffer)?;
    let (slice, buffer) = buffer.decode_slice(len.as_usize())?;
    Ok((slice.into_less_safe_slice(), buffer))
}

/// Writes `value` preceded by its length as a varint.
#[inline]
pub fn encode_slice_with_varint_len(
    buffer: &mut EncoderBuffer<'_>,
    value: &[u8],
) -> Result<(), EncoderError> {
    let len = VarInt::try_from(value.len() as u64).expect("slice length fits in a varint");
    len.encode(buffer)?;
    buffer.write_slice(value)
}

#[inline]
fn encoding_size_of(value: u64) -> usize {
    if value < 64 {
        1
    } else if value < 16_384 {
        2
    } else if value < 1_073_741_824 {
        4
    } else {
        8
    }
}

impl TryFrom<u64> for VarInt {
    type Error = VarIntError;

    #[inline]
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        VarInt::new(value)
    }
}

impl TryFrom<usize> for VarInt {
    type Error = VarIntError;

    #[inline]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        VarInt::new(value as u64)
    }
}

macro_rules! from_small_int {
    ($ty:ty) => {
        impl From<$ty> for VarInt {
            #[inline]
            fn from(value: $ty) -> Self {
                VarInt(value as u64)
            }
        }
    };
}

from_small_int!(u8);
from_small_int!(u16);
from_small_int!(u32);

impl From<VarInt> for u64 {
    #[inline]
    fn from(value: VarInt) -> Self {
        value.0
    }
}

impl From<VarInt> for usize {
    #[inline]
    fn from(value: VarInt) -> Self {
        value.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcodec_buffer::EncoderBuffer;

    #[test]
    fn decodes_s1_example() {
        let bytes = [0xc2, 0x19, 0x7c, 0x5e, 0xff, 0x14, 0xe8, 0x8c];
        let (value, rest) = VarInt::decode(DecoderBuffer::new(&bytes)).unwrap();
        assert_eq!(value.as_u64(), 151288809941952652);
        assert!(rest.is_empty());
    }

    #[test]
    fn encodes_s1_example() {
        let value = VarInt::new(151288809941952652).unwrap();
        let mut out = [0u8; 8];
        let mut buffer = EncoderBuffer::new(&mut out);
        value.encode(&mut buffer).unwrap();
        assert_eq!(out, [0xc2, 0x19, 0x7c, 0x5e, 0xff, 0x14, 0xe8, 0x8c]);
    }

    #[test]
    fn accepts_non_minimal_encodings() {
        // zero, deliberately encoded in each of the four length classes
        for (bytes, len) in [
            (&[0x00u8][..], 1),
            (&[0x40, 0x00][..], 2),
            (&[0x80, 0x00, 0x00, 0x00][..], 4),
            (&[0xc0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..], 8),
        ] {
            let (value, rest) = VarInt::decode(DecoderBuffer::new(bytes)).unwrap();
            assert_eq!(value.as_u64(), 0);
            assert_eq!(rest.len(), 0);
            assert_eq!(bytes.len(), len);
        }
    }

    #[test]
    fn round_trips_boundary_values() {
        for value in [0u64, 63, 64, 16_383, 16_384, 1_073_741_823, 1_073_741_824, MAX_VARINT_VALUE] {
            let v = VarInt::new(value).unwrap();
            let mut out = [0u8; 8];
            let mut buffer = EncoderBuffer::new(&mut out);
            v.encode(&mut buffer).unwrap();
            let written = buffer.len();
            let (decoded, rest) = VarInt::decode(DecoderBuffer::new(&out[..written])).unwrap();
            assert_eq!(decoded.as_u64(), value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(VarInt::new(MAX_VARINT_VALUE + 1).is_err());
    }

    #[test]
    fn truncated_input_is_eof() {
        let bytes = [0xc2, 0x19];
        assert_eq!(
            VarInt::decode(DecoderBuffer::new(&bytes)).unwrap_err(),
            DecoderError::UnexpectedEof(6)
        );
    }
}
