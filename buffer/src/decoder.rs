use crate::DecoderError;
use byteorder::{BigEndian, ByteOrder};

/// A panic-free cursor over a borrowed byte slice.
///
/// Every decode method consumes `self` and returns a new buffer positioned
/// just past the bytes it read, so a caller chains reads with `?` instead of
/// tracking an offset by hand. The cursor is never advanced past the end of
/// the slice it was built from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct DecoderBuffer<'a> {
    bytes: &'a [u8],
}

pub type DecoderBufferResult<'a, T> = Result<(T, DecoderBuffer<'a>), DecoderError>;

impl<'a> DecoderBuffer<'a> {
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the remaining bytes without advancing the cursor. Named
    /// `less_safe` because the returned slice escapes the bounds checking
    /// this type otherwise guarantees.
    #[inline]
    pub fn into_less_safe_slice(self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    #[inline]
    pub fn ensure_len(&self, len: usize) -> Result<(), DecoderError> {
        if self.bytes.len() < len {
            Err(DecoderError::UnexpectedEof(len - self.bytes.len()))
        } else {
            Ok(())
        }
    }

    /// Splits off the next `len` bytes as a sub-buffer, returning it along
    /// with a buffer over whatever remains.
    #[inline]
    pub fn decode_slice(self, len: usize) -> DecoderBufferResult<'a, DecoderBuffer<'a>> {
        self.ensure_len(len)?;
        let (value, rest) = self.bytes.split_at(len);
        Ok((DecoderBuffer::new(value), DecoderBuffer::new(rest)))
    }

    /// Advances past `len` bytes without retaining them.
    #[inline]
    pub fn skip(self, len: usize) -> Result<DecoderBuffer<'a>, DecoderError> {
        let (_, rest) = self.decode_slice(len)?;
        Ok(rest)
    }

    #[inline]
    pub fn decode_u8(self) -> DecoderBufferResult<'a, u8> {
        let (value, buffer) = self.decode_slice(1)?;
        Ok((value.into_less_safe_slice()[0], buffer))
    }

    #[inline]
    pub fn decode_u16(self) -> DecoderBufferResult<'a, u16> {
        let (value, buffer) = self.decode_slice(2)?;
        Ok((BigEndian::read_u16(value.into_less_safe_slice()), buffer))
    }

    #[inline]
    pub fn decode_u24(self) -> DecoderBufferResult<'a, u32> {
        let (value, buffer) = self.decode_slice(3)?;
        Ok((BigEndian::read_u24(value.into_less_safe_slice()), buffer))
    }

    #[inline]
    pub fn decode_u32(self) -> DecoderBufferResult<'a, u32> {
        let (value, buffer) = self.decode_slice(4)?;
        Ok((BigEndian::read_u32(value.into_less_safe_slice()), buffer))
    }

    #[inline]
    pub fn decode_u64(self) -> DecoderBufferResult<'a, u64> {
        let (value, buffer) = self.decode_slice(8)?;
        Ok((BigEndian::read_u64(value.into_less_safe_slice()), buffer))
    }

    /// Decodes a length-prefixed slice where the prefix width is fixed by
    /// the caller (e.g. the single-byte connection-ID length fields of a
    /// long packet header).
    #[inline]
    pub fn decode_slice_with_u8_len_prefix(self) -> DecoderBufferResult<'a, DecoderBuffer<'a>> {
        let (len, buffer) = self.decode_u8()?;
        buffer.decode_slice(len as usize)
    }

    #[inline]
    pub fn ensure_empty(self) -> Result<(), DecoderError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecoderError::UnexpectedBytes(self.len()))
        }
    }
}

impl<'a> From<&'a [u8]> for DecoderBuffer<'a> {
    #[inline]
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}
