//! Position bookkeeping for the aligned `Hashes`/`Actors` arrays.
//!
//! None of these functions fail: callers check for presence or absence with
//! [`find`] before inserting or removing.

use std::cmp::Ordering;

use crate::byml::Value;
use crate::hasher::HashKey;

/// Finds the exact position of `key` by bit pattern.
pub fn find(hashes: &[HashKey], key: HashKey) -> Option<usize> {
    let mut low = 0;
    let mut high = hashes.len();

    while low < high {
        let mid = low + (high - low) / 2;

        match hashes[mid].cmp(&key) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

/// Leftmost position at which `key` keeps `hashes` ascending, i.e. before
/// the first element greater than or equal to it.
pub fn insertion_point(hashes: &[HashKey], key: HashKey) -> usize {
    hashes.partition_point(|h| *h < key)
}

/// Inserts `key` and `record` at the same position of both arrays.
pub fn insert(
    hashes: &mut Vec<HashKey>,
    actors: &mut Vec<Value>,
    index: usize,
    key: HashKey,
    record: Value,
) {
    debug_assert_eq!(hashes.len(), actors.len());
    hashes.insert(index, key);
    actors.insert(index, record);
}

/// Removes the entries at `index` from both arrays.
pub fn remove(hashes: &mut Vec<HashKey>, actors: &mut Vec<Value>, index: usize) -> (HashKey, Value) {
    debug_assert_eq!(hashes.len(), actors.len());
    (hashes.remove(index), actors.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys(bits: &[u32]) -> Vec<HashKey> {
        bits.iter().copied().map(HashKey::from_bits).collect()
    }

    #[test]
    fn test_find() {
        let hashes = keys(&[10, 30, 50, 0x8000_0000, 0xFFFF_FFFF]);
        assert_eq!(find(&hashes, HashKey::from_bits(10)), Some(0));
        assert_eq!(find(&hashes, HashKey::from_bits(50)), Some(2));
        assert_eq!(find(&hashes, HashKey::from_bits(0xFFFF_FFFF)), Some(4));
        assert_eq!(find(&hashes, HashKey::from_bits(20)), None);
        assert_eq!(find(&hashes, HashKey::from_bits(0)), None);
        assert_eq!(find(&[], HashKey::from_bits(0)), None);
    }

    #[test]
    fn test_find_is_symmetric_across_representations() {
        let stored = [Value::I32(7), Value::I32(i32::MIN), Value::U32(0xFFFF_FFFE)];
        let hashes: Vec<HashKey> = stored.iter().filter_map(HashKey::from_value).collect();

        // Search with the opposite tagging of each stored value
        let lookups = [Value::U32(7), Value::U32(0x8000_0000), Value::I32(-2)];
        for (i, lookup) in lookups.iter().enumerate() {
            let key = HashKey::from_value(lookup).unwrap();
            assert_eq!(find(&hashes, key), Some(i));
        }
    }

    #[test]
    fn test_insertion_point() {
        let hashes = keys(&[10, 30, 50]);
        assert_eq!(insertion_point(&hashes, HashKey::from_bits(5)), 0);
        assert_eq!(insertion_point(&hashes, HashKey::from_bits(20)), 1);
        assert_eq!(insertion_point(&hashes, HashKey::from_bits(30)), 1);
        assert_eq!(insertion_point(&hashes, HashKey::from_bits(60)), 3);
        // Compared unsigned, so a "negative" hash goes last
        assert_eq!(insertion_point(&hashes, HashKey::from_bits(0x9000_0000)), 3);
    }

    #[test]
    fn test_insert_and_remove_keep_alignment() {
        let mut hashes = keys(&[10, 30, 50]);
        let mut actors = vec![Value::from("a"), Value::from("c"), Value::from("e")];

        let at = insertion_point(&hashes, HashKey::from_bits(20));
        insert(&mut hashes, &mut actors, at, HashKey::from_bits(20), Value::from("b"));
        assert_eq!(hashes, keys(&[10, 20, 30, 50]));
        assert_eq!(
            actors,
            vec![Value::from("a"), Value::from("b"), Value::from("c"), Value::from("e")]
        );

        let (key, actor) = remove(&mut hashes, &mut actors, 2);
        assert_eq!(key, HashKey::from_bits(30));
        assert_eq!(actor, Value::from("c"));
        assert_eq!(hashes, keys(&[10, 20, 50]));
        assert_eq!(actors, vec![Value::from("a"), Value::from("b"), Value::from("e")]);
    }

    proptest! {
        #[test]
        fn prop_find_agrees_with_linear_scan(
            mut bits in proptest::collection::vec(any::<u32>(), 0..64),
            needle in any::<u32>(),
        ) {
            bits.sort_unstable();
            bits.dedup();
            let hashes = keys(&bits);
            let key = HashKey::from_bits(needle);
            prop_assert_eq!(find(&hashes, key), hashes.iter().position(|h| *h == key));

            let at = insertion_point(&hashes, key);
            prop_assert!(hashes[..at].iter().all(|h| *h < key));
            prop_assert!(hashes[at..].iter().all(|h| *h >= key));
        }
    }
}
