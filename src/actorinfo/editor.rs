use std::fmt;

use tracing::{info, warn};

use super::{index, Container, NAME_KEY};
use crate::byml::{Hash, Value};
use crate::error::Result;
use crate::hasher::HashKey;
use crate::Error;

/// Outcome of [`Container::duplicate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicated {
    pub from: String,
    pub to: String,
    /// Position the copy was inserted at
    pub index: usize,
}

impl fmt::Display for Duplicated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Outcome of [`Container::edit`]. `old` is `Null` when the field was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Edited {
    pub name: String,
    pub field: String,
    pub old: Value,
    pub new: Value,
}

impl fmt::Display for Edited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}['{}']: '{}' -> '{}'",
            self.name, self.field, self.old, self.new
        )
    }
}

/// Outcome of [`Container::remove`], carrying whatever was taken out.
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    Entry {
        name: String,
        key: HashKey,
        record: Value,
    },
    Field {
        name: String,
        field: String,
        value: Value,
    },
}

impl fmt::Display for Removed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Removed::Entry { name, .. } => write!(f, "{} removed", name),
            Removed::Field { name, field, .. } => write!(f, "{}['{}'] removed", name, field),
        }
    }
}

fn record_name(record: &Value) -> Option<&str> {
    record.child(NAME_KEY).and_then(Value::as_str)
}

impl Container {
    /// Resolves a record name to its position in both arrays.
    fn locate(&self, name: &str) -> Result<usize> {
        let key = HashKey::of(name);
        let position =
            index::find(&self.hashes, key).ok_or_else(|| Error::NotFound(name.to_string()))?;

        match record_name(&self.actors[position]) {
            Some(stored) if stored != name => warn!(
                requested = name,
                stored,
                hash = %key,
                "Hash matches an entry with a different name"
            ),
            None => warn!(requested = name, hash = %key, "Matched entry has no name"),
            _ => {}
        }
        Ok(position)
    }

    fn record_mut(&mut self, position: usize, name: &str) -> Result<&mut Hash> {
        self.actors[position]
            .as_hash_mut()
            .ok_or_else(|| Error::InvalidFormat(format!("entry '{}' is not a hash", name)))
    }

    /// Returns the record called `name`, or the value at `path` inside it.
    ///
    /// `path` is first looked up as a literal key. Otherwise it is read as a
    /// `.`-separated list of hash keys and array positions, e.g. `tags.0`.
    pub fn get(&self, name: &str, path: Option<&str>) -> Result<&Value> {
        let record = &self.actors[self.locate(name)?];

        match path {
            None => Ok(record),
            Some(path) => record
                .child(path)
                .or_else(|| {
                    path.split('.')
                        .try_fold(record, |node, segment| node.child(segment))
                })
                .ok_or_else(|| Error::FieldNotFound {
                    name: name.to_string(),
                    field: path.to_string(),
                }),
        }
    }

    /// Deep-copies the record `from` under the name `to`, inserting the copy at
    /// its sorted position.
    pub fn duplicate(&mut self, from: &str, to: &str) -> Result<Duplicated> {
        let source = self.locate(from)?;

        let key = HashKey::of(to);
        if let Some(existing) = index::find(&self.hashes, key) {
            if let Some(stored) = record_name(&self.actors[existing]).filter(|s| *s != to) {
                warn!(name = to, stored, hash = %key, "Target name collides with an existing hash");
            }
            return Err(Error::AlreadyExists(to.to_string()));
        }

        let mut record = self.actors[source].clone();
        record
            .as_hash_mut()
            .ok_or_else(|| Error::InvalidFormat(format!("entry '{}' is not a hash", from)))?
            .insert(NAME_KEY.to_string(), Value::from(to));

        let position = index::insertion_point(&self.hashes, key);
        index::insert(&mut self.hashes, &mut self.actors, position, key, record);

        info!(from, to, hash = %key, index = position, "Duplicated entry");
        Ok(Duplicated {
            from: from.to_string(),
            to: to.to_string(),
            index: position,
        })
    }

    /// Sets `field` of the record `name` to `value`.
    ///
    /// The entry keeps its position even when `field` is `name`, so renaming
    /// through this call leaves the stored hash pointing at the old name.
    pub fn edit(&mut self, name: &str, field: &str, value: Value) -> Result<Edited> {
        let position = self.locate(name)?;
        if field == NAME_KEY {
            warn!(name, "Editing 'name' does not rehash or move the entry");
        }

        let record = self.record_mut(position, name)?;
        let old = record
            .insert(field.to_string(), value.clone())
            .unwrap_or(Value::Null);

        info!(name, field, "Edited entry");
        Ok(Edited {
            name: name.to_string(),
            field: field.to_string(),
            old,
            new: value,
        })
    }

    /// Removes the record `name` from both arrays, or only its `field` when
    /// one is given.
    pub fn remove(&mut self, name: &str, field: Option<&str>) -> Result<Removed> {
        let position = self.locate(name)?;

        match field {
            None => {
                let (key, record) = index::remove(&mut self.hashes, &mut self.actors, position);
                info!(name, hash = %key, index = position, "Removed entry");
                Ok(Removed::Entry {
                    name: name.to_string(),
                    key,
                    record,
                })
            }
            Some(field) => {
                let value = self
                    .record_mut(position, name)?
                    .remove(field)
                    .ok_or_else(|| Error::FieldNotFound {
                        name: name.to_string(),
                        field: field.to_string(),
                    })?;
                info!(name, field, "Removed field");
                Ok(Removed::Field {
                    name: name.to_string(),
                    field: field.to_string(),
                    value,
                })
            }
        }
    }
}
