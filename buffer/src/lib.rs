#![cfg_attr(not(feature = "std"), no_std)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{DecoderBuffer, DecoderBufferResult};
pub use encoder::EncoderBuffer;
pub use error::{DecoderError, EncoderError};

/// Anything that can report its own encoded length and write itself into an
/// [`EncoderBuffer`]. The two-pass builder contract (size, then write) lives
/// at each call site: call `encoded_len` to size a buffer, then `encode`
/// into it once allocated.
pub trait WireEncode {
    fn encoded_len(&self) -> usize;
    fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError>;
}
