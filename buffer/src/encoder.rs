use crate::EncoderError;
use byteorder::{BigEndian, ByteOrder};

/// A panic-free cursor over a caller-provided `&mut [u8]`.
///
/// The codec never allocates its own output storage; every builder writes
/// through one of these, which tracks how many bytes have been written and
/// refuses to write past the end of the slice it was given.
#[derive(Debug, Eq, PartialEq)]
pub struct EncoderBuffer<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> EncoderBuffer<'a> {
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.bytes.len() - self.position
    }

    #[inline]
    pub fn write_slice(&mut self, value: &[u8]) -> Result<(), EncoderError> {
        let end = self
            .position
            .checked_add(value.len())
            .ok_or(EncoderError::UnexpectedEnd(value.len()))?;
        if end > self.bytes.len() {
            return Err(EncoderError::UnexpectedEnd(end - self.bytes.len()));
        }
        self.bytes[self.position..end].copy_from_slice(value);
        self.position = end;
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<(), EncoderError> {
        self.write_slice(&[value])
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<(), EncoderError> {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.write_slice(&buf)
    }

    #[inline]
    pub fn write_u24(&mut self, value: u32) -> Result<(), EncoderError> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.write_slice(&buf[1..])
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<(), EncoderError> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.write_slice(&buf)
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) -> Result<(), EncoderError> {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, value);
        self.write_slice(&buf)
    }

    /// Writes each chunk of a scatter-gather payload in order, as used by
    /// CRYPTO/STREAM frame builders that accept chained buffers instead of
    /// one contiguous slice.
    #[inline]
    pub fn write_chunks<I>(&mut self, chunks: I) -> Result<(), EncoderError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for chunk in chunks {
            self.write_slice(chunk.as_ref())?;
        }
        Ok(())
    }

    /// Overwrites `len` bytes starting at `offset`, which must already have
    /// been written. Used to backpatch a packet's length field once the
    /// payload size is known.
    #[inline]
    pub fn set_slice_at(&mut self, offset: usize, value: &[u8]) -> Result<(), EncoderError> {
        let end = offset + value.len();
        if end > self.position {
            return Err(EncoderError::UnexpectedEnd(end - self.position));
        }
        self.bytes[offset..end].copy_from_slice(value);
        Ok(())
    }
}
