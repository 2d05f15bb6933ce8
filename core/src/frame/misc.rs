//! The three frame types with no fields at all: PADDING, PING,
//! HANDSHAKE_DONE (RFC 9000 §19.1, §19.2, §19.21).

use qcodec_buffer::{DecoderBuffer, EncoderBuffer, EncoderError};

pub const PADDING_TAG: u8 = 0x00;
pub const PING_TAG: u8 = 0x01;
pub const HANDSHAKE_DONE_TAG: u8 = 0x1e;

/// A run of consecutive PADDING bytes, folded into a single frame by the
/// parser rather than emitted one frame per zero byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Padding {
    pub len: usize,
}

/// Consumes every consecutive `0x00` byte starting at `buffer`'s cursor,
/// including the one already read as this frame's type tag. `buffer` must
/// be positioned just past that first tag byte.
pub fn parse_padding(buffer: DecoderBuffer<'_>) -> (Padding, DecoderBuffer<'_>) {
    let mut len = 1;
    let mut rest = buffer;
    while rest.peek_byte(0) == Some(PADDING_TAG) {
        rest = rest.skip(1).expect("peek_byte(0) confirmed a byte is present");
        len += 1;
    }
    (Padding { len }, rest)
}

impl Padding {
    pub fn encoded_len(&self) -> usize {
        self.len
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        for _ in 0..self.len {
            buffer.write_u8(PADDING_TAG)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_a_run_of_padding_into_one_frame() {
        let bytes = [0x00u8, 0x00, 0x00, 0x01 /* PING, not padding */];
        let (padding, rest) = parse_padding(DecoderBuffer::new(&bytes[1..]));
        assert_eq!(padding.len, 3);
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn round_trips_padding() {
        let padding = Padding { len: 4 };
        let mut out = vec![0xffu8; padding.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        padding.encode(&mut buffer).unwrap();
        assert_eq!(out, vec![0x00u8; 4]);
    }
}
