use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a blob frame is laid out on disk.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

/// true if (u - c) >= u * min_gain  ⇔  c <= u * (1 - min_gain)
pub fn should_compress(u: usize, c: usize, min_gain: f32) -> bool {
    (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}

/// Trial-compress `plain` and keep zstd only when it saves at least `min_gain`.
pub fn encode_frame(plain: &[u8], level: i32, min_gain: f32) -> Result<(CodecId, Vec<u8>)> {
    if plain.is_empty() {
        return Ok((CodecId::Store, Vec::new()));
    }
    let packed = zstd::bulk::compress(plain, level.max(1))?;
    if should_compress(plain.len(), packed.len(), min_gain) {
        Ok((CodecId::Zstd, packed))
    } else {
        Ok((CodecId::Store, plain.to_vec()))
    }
}

/// Inverse of [`encode_frame`]. A zstd frame that inflates past `u_size` is an error.
pub fn decode_frame(codec: CodecId, frame: &[u8], u_size: u64) -> Result<Vec<u8>> {
    match codec {
        CodecId::Store => Ok(frame.to_vec()),
        CodecId::Zstd => Ok(zstd::bulk::decompress(frame, u_size as usize)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetitive_data_is_compressed() {
        let plain = vec![b'a'; 16 * 1024];
        let (codec, frame) = encode_frame(&plain, 3, 0.05).unwrap();
        assert_eq!(codec, CodecId::Zstd);
        assert!(frame.len() < plain.len());
        assert_eq!(decode_frame(codec, &frame, plain.len() as u64).unwrap(), plain);
    }

    #[test]
    fn tiny_payload_falls_back_to_store() {
        let plain = [72u8, 105];
        let (codec, frame) = encode_frame(&plain, 3, 0.05).unwrap();
        assert_eq!(codec, CodecId::Store);
        assert_eq!(frame, plain);
    }

    #[test]
    fn empty_payload_is_an_empty_store_frame() {
        let (codec, frame) = encode_frame(&[], 3, 0.05).unwrap();
        assert_eq!(codec, CodecId::Store);
        assert!(frame.is_empty());
        assert!(decode_frame(codec, &frame, 0).unwrap().is_empty());
    }

    #[test]
    fn frame_larger_than_its_recorded_size_is_rejected() {
        let plain = vec![7u8; 4096];
        let (codec, frame) = encode_frame(&plain, 3, 0.05).unwrap();
        assert_eq!(codec, CodecId::Zstd);
        assert!(decode_frame(codec, &frame, 16).is_err());
    }

    #[test]
    fn gain_threshold() {
        assert!(should_compress(100, 90, 0.05));
        assert!(!should_compress(100, 97, 0.05));
    }
}
