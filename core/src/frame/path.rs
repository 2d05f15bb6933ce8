//! PATH_CHALLENGE / PATH_RESPONSE (RFC 9000 §19.17-19.18): eight opaque
//! bytes the peer must echo back unchanged.

use qcodec_buffer::{DecoderBuffer, DecoderBufferResult, EncoderBuffer, EncoderError};

pub const PATH_CHALLENGE_TAG: u8 = 0x1a;
pub const PATH_RESPONSE_TAG: u8 = 0x1b;

pub const PATH_DATA_LEN: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PathChallenge {
    pub data: [u8; PATH_DATA_LEN],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PathResponse {
    pub data: [u8; PATH_DATA_LEN],
}

fn parse_path_data(buffer: DecoderBuffer<'_>) -> DecoderBufferResult<'_, [u8; PATH_DATA_LEN]> {
    let (slice, buffer) = buffer.decode_slice(PATH_DATA_LEN)?;
    let data: [u8; PATH_DATA_LEN] = slice
        .into_less_safe_slice()
        .try_into()
        .expect("decode_slice returned exactly PATH_DATA_LEN bytes");
    Ok((data, buffer))
}

pub fn parse_path_challenge(
    buffer: DecoderBuffer<'_>,
) -> Result<(PathChallenge, DecoderBuffer<'_>), qcodec_buffer::DecoderError> {
    let (data, buffer) = parse_path_data(buffer)?;
    Ok((PathChallenge { data }, buffer))
}

pub fn parse_path_response(
    buffer: DecoderBuffer<'_>,
) -> Result<(PathResponse, DecoderBuffer<'_>), qcodec_buffer::DecoderError> {
    let (data, buffer) = parse_path_data(buffer)?;
    Ok((PathResponse { data }, buffer))
}

impl PathChallenge {
    pub fn encoded_len(&self) -> usize {
        1 + PATH_DATA_LEN
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(PATH_CHALLENGE_TAG)?;
        buffer.write_slice(&self.data)
    }
}

impl PathResponse {
    pub fn encoded_len(&self) -> usize {
        1 + PATH_DATA_LEN
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer<'_>) -> Result<(), EncoderError> {
        buffer.write_u8(PATH_RESPONSE_TAG)?;
        buffer.write_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_path_challenge_and_response() {
        let challenge = PathChallenge { data: [7; PATH_DATA_LEN] };
        let mut out = vec![0u8; challenge.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        challenge.encode(&mut buffer).unwrap();
        assert_eq!(out[0], PATH_CHALLENGE_TAG);
        let (parsed, rest) = parse_path_challenge(DecoderBuffer::new(&out[1..])).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, challenge);

        let response = PathResponse { data: challenge.data };
        let mut out = vec![0u8; response.encoded_len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        response.encode(&mut buffer).unwrap();
        let (parsed, _) = parse_path_response(DecoderBuffer::new(&out[1..])).unwrap();
        assert_eq!(parsed, response);
    }
}
