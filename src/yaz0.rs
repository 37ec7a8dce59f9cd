//! Yaz0 compression envelope.
//!
//! A stream starts with a 16-byte header (`Yaz0`, big-endian decompressed
//! size, alignment, reserved) followed by groups of one code byte and up to
//! eight chunks. Code bits are read MSB first: a set bit copies one literal
//! byte, a clear bit is a back-reference into the last 4 KiB of output.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::error::Result;
use crate::Error;

pub const MAGIC: [u8; 4] = *b"Yaz0";
pub const HEADER_SIZE: usize = 16;

const WINDOW: usize = 0x1000;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 0xFF + 0x12;

const HASH_BITS: u32 = 15;
const NO_POSITION: u32 = u32::MAX;

/// Returns true when `data` starts with the Yaz0 magic.
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&MAGIC)
}

/// Decompresses a complete Yaz0 stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if !is_compressed(data) {
        return Err(Error::InvalidFormat("missing Yaz0 magic".to_string()));
    }

    let mut header = Cursor::new(&data[MAGIC.len()..]);
    let size = header
        .read_u32::<BigEndian>()
        .map_err(|e| Error::Decode("yaz0 size", e))? as usize;
    let _alignment = header
        .read_u32::<BigEndian>()
        .map_err(|e| Error::Decode("yaz0 alignment", e))?;
    let mut reserved = [0u8; 4];
    header
        .read_exact(&mut reserved)
        .map_err(|e| Error::Decode("yaz0 header", e))?;

    let mut input = Cursor::new(&data[HEADER_SIZE..]);
    // Capacity is capped since the header size is untrusted
    let mut out = Vec::with_capacity(size.min(data.len().saturating_mul(9)));

    while out.len() < size {
        let code = input
            .read_u8()
            .map_err(|e| Error::Decode("yaz0 code byte", e))?;

        for bit in (0..8).rev() {
            if out.len() >= size {
                break;
            }

            if code & (1 << bit) != 0 {
                let byte = input
                    .read_u8()
                    .map_err(|e| Error::Decode("yaz0 literal", e))?;
                out.push(byte);
                continue;
            }

            let b1 = input
                .read_u8()
                .map_err(|e| Error::Decode("yaz0 back-reference", e))? as usize;
            let b2 = input
                .read_u8()
                .map_err(|e| Error::Decode("yaz0 back-reference", e))? as usize;
            let distance = ((b1 & 0x0F) << 8 | b2) + 1;
            let length = match b1 >> 4 {
                0 => {
                    input
                        .read_u8()
                        .map_err(|e| Error::Decode("yaz0 back-reference length", e))?
                        as usize
                        + 0x12
                }
                n => n + 2,
            };

            if distance > out.len() {
                return Err(Error::InvalidFormat(format!(
                    "yaz0 back-reference distance {} exceeds {} decoded bytes",
                    distance,
                    out.len()
                )));
            }

            // Byte by byte: a reference may overlap the bytes it produces
            let start = out.len() - distance;
            for i in 0..length.min(size - out.len()) {
                let byte = out[start + i];
                out.push(byte);
            }
        }
    }

    debug!(compressed = data.len(), decompressed = out.len(), "Decompressed Yaz0 stream");
    Ok(out)
}

/// Compresses `data` into a Yaz0 stream.
///
/// `level` bounds how many earlier positions are tried per match; 0 emits
/// literals only. Output is always valid for any level.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let size = u32::try_from(data.len()).map_err(|_| {
        Error::InvalidValue(format!("{} bytes is too large for Yaz0", data.len()))
    })?;

    let mut out = Vec::with_capacity(HEADER_SIZE + data.len() + data.len() / 8 + 1);
    out.extend_from_slice(&MAGIC);
    out.write_u32::<BigEndian>(size)?;
    out.write_u32::<BigEndian>(0)?;
    out.write_u32::<BigEndian>(0)?;

    let mut finder = MatchFinder::new(data, chain_limit(level));
    let mut pos = 0;
    let mut code_at = 0;
    let mut chunks = 8;

    while pos < data.len() {
        if chunks == 8 {
            code_at = out.len();
            out.push(0);
            chunks = 0;
        }

        match finder.longest(pos) {
            Some((distance, length)) => {
                let d = distance - 1;
                if length >= 0x12 {
                    out.push((d >> 8) as u8);
                    out.push(d as u8);
                    out.push((length - 0x12) as u8);
                } else {
                    out.push((((length - 2) << 4) | (d >> 8)) as u8);
                    out.push(d as u8);
                }
                for p in pos..pos + length {
                    finder.insert(p);
                }
                pos += length;
            }
            None => {
                out[code_at] |= 0x80 >> chunks;
                out.push(data[pos]);
                finder.insert(pos);
                pos += 1;
            }
        }
        chunks += 1;
    }

    debug!(
        decompressed = data.len(),
        compressed = out.len(),
        level,
        "Compressed Yaz0 stream"
    );
    Ok(out)
}

fn chain_limit(level: u32) -> usize {
    match level {
        0 => 0,
        n => 1 << n.min(9),
    }
}

/// Hash-chain index over 3-byte prefixes of the input.
struct MatchFinder<'a> {
    data: &'a [u8],
    head: Vec<u32>,
    prev: Vec<u32>,
    max_chain: usize,
}

impl<'a> MatchFinder<'a> {
    fn new(data: &'a [u8], max_chain: usize) -> Self {
        let (head, prev) = if max_chain == 0 {
            (Vec::new(), Vec::new())
        } else {
            (vec![NO_POSITION; 1 << HASH_BITS], vec![NO_POSITION; data.len()])
        };
        Self {
            data,
            head,
            prev,
            max_chain,
        }
    }

    fn hash(&self, pos: usize) -> usize {
        let d = self.data;
        let key = (d[pos] as u32) << 16 | (d[pos + 1] as u32) << 8 | d[pos + 2] as u32;
        (key.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, pos: usize) {
        if self.max_chain == 0 || pos + MIN_MATCH > self.data.len() {
            return;
        }
        let h = self.hash(pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos as u32;
    }

    /// Returns `(distance, length)` of the longest earlier match at `pos`.
    fn longest(&self, pos: usize) -> Option<(usize, usize)> {
        if self.max_chain == 0 || pos + MIN_MATCH > self.data.len() {
            return None;
        }

        let limit = MAX_MATCH.min(self.data.len() - pos);
        let mut best: Option<(usize, usize)> = None;
        let mut candidate = self.head[self.hash(pos)];
        let mut steps = 0;

        while candidate != NO_POSITION && steps < self.max_chain {
            let start = candidate as usize;
            let distance = pos - start;
            if distance > WINDOW {
                break;
            }

            let length = self.data[start..]
                .iter()
                .zip(&self.data[pos..pos + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if length >= MIN_MATCH && best.map_or(true, |(_, l)| length > l) {
                best = Some((distance, length));
                if length == limit {
                    break;
                }
            }

            candidate = self.prev[start];
            steps += 1;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decompress_literals_and_reference() {
        // "abcabcabc": 3 literals then a 6 byte reference at distance 3
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0b1110_0000, b'a', b'b', b'c', 0x40, 0x02]);

        assert_eq!(decompress(&data).unwrap(), b"abcabcabc");
    }

    #[test]
    fn test_decompress_long_reference() {
        // One literal then a 0x20 byte run using the three-byte form
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0x21, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0b1000_0000, b'z', 0x00, 0x00, 0x20 - 0x12]);

        assert_eq!(decompress(&data).unwrap(), vec![b'z'; 0x21]);
    }

    #[test]
    fn test_decompress_rejects_bad_input() {
        assert!(matches!(
            decompress(b"BY\x00\x02"),
            Err(Error::InvalidFormat(_))
        ));

        // Reference before any output
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x00, 0x20, 0x00]);
        assert!(matches!(decompress(&data), Err(Error::InvalidFormat(_))));

        // Stream ends before the declared size
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0xF0, b'a']);
        assert!(matches!(decompress(&data), Err(Error::Decode(_, _))));
    }

    #[test]
    fn test_compress_header() {
        let out = compress(b"hello", 6).unwrap();
        assert!(is_compressed(&out));
        assert_eq!(out[4..8], [0, 0, 0, 5]);
        assert_eq!(out[8..16], [0; 8]);
    }

    #[test]
    fn test_compress_shrinks_repetitive_input() {
        let data: Vec<u8> = b"Enemy_Lizalfos_".iter().cycle().take(4096).copied().collect();
        let out = compress(&data, 6).unwrap();
        assert!(out.len() < data.len() / 4);
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn test_level_zero_stores_literals() {
        let data = vec![7u8; 64];
        let out = compress(&data, 0).unwrap();
        // 8 code bytes + 64 literals
        assert_eq!(out.len(), HEADER_SIZE + 8 + 64);
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn test_empty_input() {
        let out = compress(&[], 6).unwrap();
        assert_eq!(out.len(), HEADER_SIZE);
        assert!(decompress(&out).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(0u8..4, 0..2048), level in 0u32..10) {
            let out = compress(&data, level).unwrap();
            prop_assert_eq!(decompress(&out).unwrap(), data);
        }
    }
}
