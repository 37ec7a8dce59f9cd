use std::fmt;

use crc::{Algorithm, Crc};

use crate::byml::Value;

pub const CRC_32: Algorithm<u32> = crc::CRC_32_ISO_HDLC; // Same polynomial as zlib's crc32

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32);

/// Computes the CRC-32 of a record name's UTF-8 bytes.
pub fn hash_name(name: &str) -> u32 {
    CRC32.checksum(name.as_bytes())
}

/// Maps a hash to the integer node the container stores it as: signed while
/// the value fits at or below `0x8000_0000`, unsigned above.
pub fn to_hash_key(bits: u32) -> Value {
    if bits > 0x8000_0000 {
        Value::U32(bits)
    } else {
        Value::I32(bits as i32)
    }
}

/// A record hash, ordered and compared by its unsigned bit pattern no matter
/// which integer node it was stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey(u32);

impl HashKey {
    pub fn of(name: &str) -> Self {
        HashKey(hash_name(name))
    }

    pub const fn from_bits(bits: u32) -> Self {
        HashKey(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn to_value(self) -> Value {
        to_hash_key(self.0)
    }

    /// Reads a stored hash from either integer representation.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::I32(v) => Some(HashKey(*v as u32)),
            Value::U32(v) => Some(HashKey(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_checksums() {
        assert_eq!(hash_name("123456789"), 0xCBF4_3926);
        assert_eq!(hash_name(""), 0);
        assert_eq!(
            hash_name("The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn test_different_names_different_hashes() {
        assert_ne!(hash_name("Enemy_Fox"), hash_name("Enemy_Wolf"));
        assert_eq!(HashKey::of("Enemy_Fox").bits(), hash_name("Enemy_Fox"));
    }

    #[test]
    fn test_representation_boundary() {
        assert_eq!(to_hash_key(0), Value::I32(0));
        assert_eq!(to_hash_key(0x7FFF_FFFF), Value::I32(i32::MAX));
        assert_eq!(to_hash_key(0x8000_0000), Value::I32(i32::MIN));
        assert_eq!(to_hash_key(0x8000_0001), Value::U32(0x8000_0001));
        assert_eq!(to_hash_key(u32::MAX), Value::U32(u32::MAX));
    }

    #[test]
    fn test_from_value_reads_bit_pattern() {
        assert_eq!(
            HashKey::from_value(&Value::I32(-1)),
            HashKey::from_value(&Value::U32(u32::MAX))
        );
        assert_eq!(
            HashKey::from_value(&Value::I32(i32::MIN)),
            Some(HashKey::from_bits(0x8000_0000))
        );
        assert_eq!(HashKey::from_value(&Value::String("1".into())), None);
        assert_eq!(HashKey::from_value(&Value::I64(1)), None);

        for bits in [0, 1, 0x7FFF_FFFF, 0x8000_0000, 0x8000_0001, u32::MAX] {
            let key = HashKey::from_bits(bits);
            assert_eq!(HashKey::from_value(&key.to_value()), Some(key));
        }
    }

    #[test]
    fn test_ordering_uses_unsigned_bits() {
        // Stored as a negative i32, still sorts after every positive hash
        let high = HashKey::from_value(&Value::I32(i32::MIN)).unwrap();
        let low = HashKey::from_value(&Value::I32(i32::MAX)).unwrap();
        assert!(low < high);
        assert_eq!(high.to_string(), "0x80000000");
    }
}
