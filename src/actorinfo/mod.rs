//! The ActorInfo container: a sorted `Hashes` array of record-name CRCs and a
//! positionally aligned `Actors` array of records.

pub mod codec;
pub mod editor;
pub mod index;

use crate::byml::{Hash, Value};
use crate::error::Result;
use crate::hasher::HashKey;
use crate::Error;

pub use codec::{ContainerCodec, ContainerHeader};
pub use editor::{Duplicated, Edited, Removed};

pub const HASHES_KEY: &str = "Hashes";
pub const ACTORS_KEY: &str = "Actors";
pub const NAME_KEY: &str = "name";

/// Decoded ActorInfo document.
///
/// `hashes[i]` is the key of `actors[i]`, and `hashes` is strictly ascending
/// by unsigned bit pattern. Every mutation goes through [`index`] so both
/// arrays move together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    hashes: Vec<HashKey>,
    actors: Vec<Value>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from records, keying and sorting them by the CRC
    /// of their `name` field.
    pub fn from_records(records: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut container = Container::new();
        for record in records {
            let name = record
                .child(NAME_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::InvalidValue(format!("record {} has no name", record)))?
                .to_string();
            let key = HashKey::of(&name);
            if index::find(&container.hashes, key).is_some() {
                return Err(Error::AlreadyExists(name));
            }
            let at = index::insertion_point(&container.hashes, key);
            index::insert(&mut container.hashes, &mut container.actors, at, key, record);
        }
        container.validate()?;
        Ok(container)
    }

    /// Converts a decoded document, rejecting anything that is not exactly
    /// `{Actors: [...], Hashes: [...]}` with consistent arrays.
    pub fn from_document(document: Value) -> Result<Self> {
        let mut root = match document {
            Value::Hash(root) => root,
            other => {
                return Err(Error::InvalidFormat(format!(
                    "top level must be a hash, found {}",
                    kind(&other)
                )))
            }
        };

        let keys: Vec<&str> = root.keys().map(String::as_str).collect();
        if keys != [ACTORS_KEY, HASHES_KEY] {
            return Err(Error::InvalidFormat(format!(
                "expected top-level keys [{}, {}], found [{}]",
                ACTORS_KEY,
                HASHES_KEY,
                keys.join(", ")
            )));
        }

        let hashes = match root.remove(HASHES_KEY) {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::InvalidFormat(format!("{} is not an array", HASHES_KEY))),
        };
        let actors = match root.remove(ACTORS_KEY) {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::InvalidFormat(format!("{} is not an array", ACTORS_KEY))),
        };

        let hashes = hashes
            .iter()
            .enumerate()
            .map(|(i, value)| {
                HashKey::from_value(value).ok_or_else(|| {
                    Error::InvalidFormat(format!(
                        "hash {} is {}, expected a 32-bit integer",
                        i,
                        kind(value)
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let container = Container { hashes, actors };
        container.validate()?;
        Ok(container)
    }

    /// Rebuilds the document, tagging each hash as a signed or unsigned node.
    pub fn to_document(&self) -> Value {
        self.clone().into_document()
    }

    pub fn into_document(self) -> Value {
        let mut root = Hash::new();
        root.insert(ACTORS_KEY.to_string(), Value::Array(self.actors));
        root.insert(
            HASHES_KEY.to_string(),
            Value::Array(self.hashes.into_iter().map(HashKey::to_value).collect()),
        );
        Value::Hash(root)
    }

    /// Checks array alignment, record shape and strict ascending order.
    pub fn validate(&self) -> Result<()> {
        if self.hashes.len() != self.actors.len() {
            return Err(Error::InvalidFormat(format!(
                "{} hashes but {} actors",
                self.hashes.len(),
                self.actors.len()
            )));
        }

        if let Some(i) = self.actors.iter().position(|a| a.as_hash().is_none()) {
            return Err(Error::InvalidFormat(format!(
                "actor {} is {}, expected a hash",
                i,
                kind(&self.actors[i])
            )));
        }

        if let Some(i) = self.hashes.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::InvalidFormat(format!(
                "hashes are not strictly ascending at index {} ({} then {})",
                i + 1,
                self.hashes[i],
                self.hashes[i + 1]
            )));
        }
        Ok(())
    }

    pub fn hashes(&self) -> &[HashKey] {
        &self.hashes
    }

    pub fn actors(&self) -> &[Value] {
        &self.actors
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Iterates `(hash, record)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (HashKey, &Value)> {
        self.hashes.iter().copied().zip(self.actors.iter())
    }

    pub fn contains(&self, name: &str) -> bool {
        index::find(&self.hashes, HashKey::of(name)).is_some()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::String(_) => "a string",
        Value::Binary(_) => "binary data",
        Value::Array(_) => "an array",
        Value::Hash(_) => "a hash",
        Value::Bool(_) => "a bool",
        Value::I32(_) | Value::U32(_) => "a 32-bit integer",
        Value::F32(_) | Value::F64(_) => "a float",
        Value::I64(_) | Value::U64(_) => "a 64-bit integer",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(name: &str) -> Value {
        let mut hash = Hash::new();
        hash.insert(NAME_KEY.to_string(), Value::from(name));
        Value::Hash(hash)
    }

    fn document(hashes: Vec<Value>, actors: Vec<Value>) -> Value {
        let mut root = Hash::new();
        root.insert(HASHES_KEY.to_string(), Value::Array(hashes));
        root.insert(ACTORS_KEY.to_string(), Value::Array(actors));
        Value::Hash(root)
    }

    #[test]
    fn test_from_records_sorts_by_hash() {
        let container =
            Container::from_records(["Wolf", "Fox", "Bear", "Enemy_Moblin"].map(record)).unwrap();
        assert_eq!(container.len(), 4);
        for (key, actor) in container.iter() {
            let name = actor.child(NAME_KEY).and_then(Value::as_str).unwrap();
            assert_eq!(key, HashKey::of(name));
        }
        assert!(container.validate().is_ok());
        assert!(container.contains("Bear"));
        assert!(!container.contains("Deer"));
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let result = Container::from_records(["Fox", "Fox"].map(record));
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_document_round_trip() {
        let container = Container::from_records(["Fox", "Wolf"].map(record)).unwrap();
        let rebuilt = Container::from_document(container.to_document()).unwrap();
        assert_eq!(container, rebuilt);
    }

    #[test]
    fn test_mixed_hash_representations() {
        let doc = document(
            vec![Value::I32(100), Value::I32(-2), Value::U32(0xFFFF_FFFF)],
            vec![record("a"), record("b"), record("c")],
        );
        let container = Container::from_document(doc).unwrap();
        assert_eq!(
            container.hashes(),
            [100, 0xFFFF_FFFE, 0xFFFF_FFFF].map(HashKey::from_bits)
        );

        // Written back canonically: large hashes become unsigned nodes
        let rebuilt = container.to_document();
        let hashes = rebuilt.child(HASHES_KEY).and_then(Value::as_array).unwrap();
        assert_eq!(
            hashes,
            [Value::I32(100), Value::U32(0xFFFF_FFFE), Value::U32(0xFFFF_FFFF)]
        );
    }

    #[test]
    fn test_rejects_wrong_top_level_keys() {
        let mut root = Hash::new();
        root.insert(HASHES_KEY.to_string(), Value::Array(vec![]));
        assert!(matches!(
            Container::from_document(Value::Hash(root.clone())),
            Err(Error::InvalidFormat(_))
        ));

        root.insert(ACTORS_KEY.to_string(), Value::Array(vec![]));
        root.insert("Extra".to_string(), Value::Array(vec![]));
        assert!(matches!(
            Container::from_document(Value::Hash(root)),
            Err(Error::InvalidFormat(_))
        ));

        assert!(matches!(
            Container::from_document(Value::Array(vec![])),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_inconsistent_arrays() {
        // Length mismatch
        let doc = document(vec![Value::I32(1)], vec![]);
        assert!(matches!(Container::from_document(doc), Err(Error::InvalidFormat(_))));

        // Not ascending
        let doc = document(
            vec![Value::I32(5), Value::I32(3)],
            vec![record("a"), record("b")],
        );
        assert!(matches!(Container::from_document(doc), Err(Error::InvalidFormat(_))));

        // Negative i32 sorts after positive values
        let doc = document(
            vec![Value::I32(-1), Value::I32(3)],
            vec![record("a"), record("b")],
        );
        assert!(matches!(Container::from_document(doc), Err(Error::InvalidFormat(_))));

        // Non-integer hash
        let doc = document(vec![Value::F32(1.0)], vec![record("a")]);
        assert!(matches!(Container::from_document(doc), Err(Error::InvalidFormat(_))));

        // Record that is not a hash
        let doc = document(vec![Value::I32(1)], vec![Value::I32(1)]);
        assert!(matches!(Container::from_document(doc), Err(Error::InvalidFormat(_))));

        // Hashes not an array
        let doc = document(vec![], vec![]);
        let mut root = doc.as_hash().unwrap().clone();
        root.insert(HASHES_KEY.to_string(), Value::I32(0));
        assert!(matches!(
            Container::from_document(Value::Hash(root)),
            Err(Error::InvalidFormat(_))
        ));
    }
}
