//! ACK / ACK_ECN frames (RFC 9000 §19.3).
//!
//! The codec walks exactly `ack_range_count` gap/range pairs to find the end
//! of the ranges region, then hands that region back as an opaque
//! `(pointer, length)` slice — turning the absolute ranges those pairs
//! describe into packet numbers is the loss-detection collaborator's job,
//! via the standalone [`parse_ack_range`] helper it calls directly.

use crate::error::CodecResult;
use crate::packet::frame_encoding_error;
use crate::varint::VarInt;
use qcodec_buffer::{DecoderBuffer, DecoderBufferResult, EncoderBuffer};

pub const ACK_TAG: u8 = 0x02;
pub const ACK_ECN_TAG: u8 = 0x03;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EcnCounts {
    pub ect_0: VarInt,
    pub ect_1: VarInt,
    pub ce: VarInt,
}

#[derive(Clone, Copy, Debug)]
pub struct Ack<'a> {
    pub largest_acknowledged: VarInt,
    pub ack_delay: VarInt,
    pub first_ack_range: VarInt,
    /// Raw `(gap, range)` varint pairs, `ack_range_count` of them, in wire
    /// order. Re-parsed one pair at a time by [`parse_ack_range`].
    pub ack_ranges: &'a [u8],
    pub ecn_counts: Option<EcnCounts>,
}

impl Ack<'_> {
    #[inline]
    pub fn tag(&self) -> u8 {
        if self.ecn_counts.is_some() {
            ACK_ECN_TAG
        } else {
            ACK_TAG
        }
    }
}

/// Reads one `(gap, range)` pair from an ACK ranges region, or `None` once
/// the region is exhausted. S3: the region `02 00` yields `gap=2, range=0`
/// and then exhausts.
pub fn parse_ack_range(buffer: DecoderBuffer<'_>) -> DecoderBufferResult<'_, Option<(VarInt, VarInt)>> {
    if buffer.is_empty() {
        return Ok((None, buffer));
    }
    let (gap, buffer) = VarInt::decode(buffer)?;
    let (range, buffer) = VarInt::decode(buffer)?;
    Ok((Some((gap, range)), buffer))
}

fn walk_ranges<'a>(
    buffer: DecoderBuffer<'a>,
    range_count: u64,
) -> CodecResult<(&'a [u8], DecoderBuffer<'a>)> {
    let start = buffer;
    let mut cursor = buffer;
    for _ in 0..range_count {
        let (pair, next) = parse_ack_range(cursor)?;
        if pair.is_none() {
            return Err(frame_encoding_error("ack ranges region truncated"));
        }
        cursor = next;
    }
    let ranges_len = start.len() - cursor.len();
    let (ranges, rest) = start.decode_slice(ranges_len)?;
    Ok((ranges.into_less_safe_slice(), rest))
}

pub fn parse<'a>(tag: u8, buffer: DecoderBuffer<'a>) -> CodecResult<(Ack<'a>, DecoderBuffer<'a>)> {
    let (largest_acknowledged, buffer) = VarInt::decode(buffer)?;
    let (ack_delay, buffer) = VarInt::decode(buffer)?;
    let (range_count, buffer) = VarInt::decode(buffer)?;
    let (first_ack_range, buffer) = VarInt::decode(buffer)?;
    let (ack_ranges, buffer) = walk_ranges(buffer, range_count.as_u64())?;

    let (ecn_counts, buffer) = if tag == ACK_ECN_TAG {
        let (ect_0, buffer) = VarInt::decode(buffer)?;
        let (ect_1, buffer) = VarInt::decode(buffer)?;
        let (ce, buffer) = VarInt::decode(buffer)?;
        (Some(EcnCounts { ect_0, ect_1, ce }), buffer)
    } else {
        (None, buffer)
    };

    Ok((
        Ack {
            largest_acknowledged,
            ack_delay,
            first_ack_range,
            ack_ranges,
            ecn_counts,
        },
        buffer,
    ))
}

impl Ack<'_> {
    /// `ack_range_count` is derived from the ranges region by replaying it
    /// with [`parse_ack_range`]; callers don't track it separately.
    fn ack_range_count(&self) -> u64 {
        let mut buffer = DecoderBuffer::new(self.ack_ranges);
        let mut count = 0u64;
        loop {
            match parse_ack_range(buffer) {
                Ok((Some(_), next)) => {
                    count += 1;
                    buffer = next;
                }
                _ => break,
            }
        }
        count
    }

    pub fn encoded_len(&self) -> usize {
        let mut len = 1; // tag
        len += self.largest_acknowledged.encoding_size();
        len += self.ack_delay.encoding_size();
        len += VarInt::try_from(self.ack_range_count()).unwrap().encoding_size();
        len += self.first_ack_range.encoding_size();
        len += self.ack_ranges.len();
        if let Some(ecn) = &self.ecn_counts {
            len += ecn.ect_0.encoding_size() + ecn.ect_1.encoding_size() + ecn.ce.encoding_size();
        }
        len
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), qcodec_buffer::EncoderError> {
        buffer.write_u8(self.tag())?;
        self.largest_acknowledged.encode(buffer)?;
        self.ack_delay.encode(buffer)?;
        VarInt::try_from(self.ack_range_count()).unwrap().encode(buffer)?;
        self.first_ack_range.encode(buffer)?;
        buffer.write_slice(self.ack_ranges)?;
        if let Some(ecn) = &self.ecn_counts {
            ecn.ect_0.encode(buffer)?;
            ecn.ect_1.encode(buffer)?;
            ecn.ce.encode(buffer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_example() {
        // largest=10, delay=25, range_count=1, first_range=0, ranges = `02 00`
        let bytes = [0x02u8, 0x0a, 0x19, 0x01, 0x00, 0x02, 0x00];
        let (ack, rest) = parse(ACK_TAG, DecoderBuffer::new(&bytes[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ack.largest_acknowledged.as_u64(), 10);
        assert_eq!(ack.ack_delay.as_u64(), 25);
        assert_eq!(ack.first_ack_range.as_u64(), 0);
        assert_eq!(ack.ack_ranges, &[0x02, 0x00]);

        let (pair, remainder) = parse_ack_range(DecoderBuffer::new(ack.ack_ranges)).unwrap();
        assert_eq!(pair, Some((VarInt::try_from(2u64).unwrap(), VarInt::try_from(0u64).unwrap())));
        let (next, _) = parse_ack_range(remainder).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn round_trips_with_ecn() {
        let ack = Ack {
            largest_acknowledged: VarInt::try_from(100u64).unwrap(),
            ack_delay: VarInt::try_from(5u64).unwrap(),
            first_ack_range: VarInt::try_from(3u64).unwrap(),
            ack_ranges: &[],
            ecn_counts: Some(EcnCounts {
                ect_0: VarInt::try_from(1u64).unwrap(),
                ect_1: VarInt::ZERO,
                ce: VarInt::ZERO,
            }),
        };
        let mut out = vec![0u8; ack.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        ack.encode(&mut buffer).unwrap();
        assert_eq!(out[0], ACK_ECN_TAG);

        let (parsed, rest) = parse(ACK_ECN_TAG, DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.ecn_counts, ack.ecn_counts);
    }
}
