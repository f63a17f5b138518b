use crate::error::{HaloError, Result};
use std::io::Read;

pub fn put_uvarint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

/// `Ok(None)` on a clean EOF before the first byte or in the middle of the varint.
pub fn get_uvarint<R: Read>(r: &mut R) -> Result<Option<u64>> {
    let mut x: u64 = 0;
    let mut s: u32 = 0;
    for _ in 0..10 {
        let mut b = [0u8; 1];
        match r.read(&mut b) {
            Ok(0) => return Ok(None),
            Ok(_) => {
                let byte = b[0];
                if byte < 0x80 {
                    x |= (byte as u64) << s;
                    return Ok(Some(x));
                }
                x |= ((byte & 0x7f) as u64) << s;
                s += 7;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(HaloError::Format("varint too long".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_seven_bits_per_byte() {
        for (x, len) in [(0u64, 1), (127, 1), (128, 2), (16_384, 3), (u64::MAX, 10)] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, x);
            assert_eq!(buf.len(), len);
            assert_eq!(get_uvarint(&mut &buf[..]).unwrap(), Some(x));
        }
    }

    #[test]
    fn truncated_varint_reads_as_eof() {
        let buf = [0x80u8, 0x80];
        assert_eq!(get_uvarint(&mut &buf[..]).unwrap(), None);
    }
}
