use std::collections::BTreeSet;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use tracing::debug;

use super::header::{Endian, Header, HEADER_SIZE, MAX_VERSION, MIN_VERSION};
use super::{node, Value};
use crate::error::Result;
use crate::Error;

const MAX_NODE_ENTRIES: usize = 0xFF_FFFF;

/// Encodes a BYML document with the given byte order and format version.
pub fn to_binary(root: &Value, endian: Endian, version: u16) -> Result<Vec<u8>> {
    Writer::new(endian, version).write(root)
}

#[derive(Debug, Clone, Copy)]
pub struct Writer {
    endian: Endian,
    version: u16,
}

impl Writer {
    pub fn new(endian: Endian, version: u16) -> Self {
        Self { endian, version }
    }

    pub fn write(&self, root: &Value) -> Result<Vec<u8>> {
        if !(MIN_VERSION..=MAX_VERSION).contains(&self.version) {
            return Err(Error::InvalidValue(format!(
                "cannot write BYML version {}",
                self.version
            )));
        }
        if !matches!(root, Value::Null | Value::Array(_) | Value::Hash(_)) {
            return Err(Error::InvalidValue(
                "document root must be a hash or an array".to_string(),
            ));
        }

        let data = match self.endian {
            Endian::Big => NodeWriter::<BigEndian>::new(self.version, root).finish(self.endian, root)?,
            Endian::Little => {
                NodeWriter::<LittleEndian>::new(self.version, root).finish(self.endian, root)?
            }
        };
        debug!(endian = ?self.endian, version = self.version, size = data.len(), "Encoded BYML document");
        Ok(data)
    }
}

fn collect<'v>(value: &'v Value, keys: &mut BTreeSet<&'v str>, strings: &mut BTreeSet<&'v str>) {
    match value {
        Value::String(s) => {
            strings.insert(s);
        }
        Value::Array(items) => items.iter().for_each(|v| collect(v, keys, strings)),
        Value::Hash(hash) => {
            for (k, v) in hash {
                keys.insert(k);
                collect(v, keys, strings);
            }
        }
        _ => {}
    }
}

struct NodeWriter<'v, E: ByteOrder> {
    buf: Vec<u8>,
    keys: Vec<&'v str>,
    strings: Vec<&'v str>,
    version: u16,
    _order: PhantomData<E>,
}

impl<'v, E: ByteOrder> NodeWriter<'v, E> {
    fn new(version: u16, root: &'v Value) -> Self {
        let mut keys = BTreeSet::new();
        let mut strings = BTreeSet::new();
        collect(root, &mut keys, &mut strings);

        Self {
            buf: Vec::new(),
            keys: keys.into_iter().collect(),
            strings: strings.into_iter().collect(),
            version,
            _order: PhantomData,
        }
    }

    fn finish(mut self, endian: Endian, root: &'v Value) -> Result<Vec<u8>> {
        let mut header = Header::new(endian, self.version);
        self.buf.resize(HEADER_SIZE, 0);

        if !self.keys.is_empty() {
            header.hash_key_table_offset = self.position();
            let keys = std::mem::take(&mut self.keys);
            self.string_table(&keys, "hash key")?;
            self.keys = keys;
        }
        if !self.strings.is_empty() {
            header.string_table_offset = self.position();
            let strings = std::mem::take(&mut self.strings);
            self.string_table(&strings, "string")?;
            self.strings = strings;
        }
        if root.is_container() {
            header.root_offset = self.container(root)?;
        }

        let encoded: Vec<u8> = (&header).try_into()?;
        self.buf[..HEADER_SIZE].copy_from_slice(&encoded);
        Ok(self.buf)
    }

    fn position(&self) -> u32 {
        self.buf.len() as u32
    }

    fn align(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    fn check_entries(len: usize, what: &str) -> Result<()> {
        if len > MAX_NODE_ENTRIES {
            return Err(Error::InvalidValue(format!(
                "{} has {} entries, the format allows {}",
                what, len, MAX_NODE_ENTRIES
            )));
        }
        Ok(())
    }

    fn string_table(&mut self, entries: &[&str], what: &str) -> Result<()> {
        Self::check_entries(entries.len(), what)?;
        if let Some(bad) = entries.iter().find(|s| s.contains('\0')) {
            return Err(Error::InvalidValue(format!(
                "{} {:?} contains a NUL byte",
                what, bad
            )));
        }

        self.buf.write_u8(node::STRING_TABLE)?;
        self.buf.write_u24::<E>(entries.len() as u32)?;

        // Offsets are relative to the table node and include a trailing end offset
        let mut relative = 4 + 4 * (entries.len() + 1);
        for s in entries {
            self.buf.write_u32::<E>(relative as u32)?;
            relative += s.len() + 1;
        }
        self.buf.write_u32::<E>(relative as u32)?;

        for s in entries {
            self.buf.extend_from_slice(s.as_bytes());
            self.buf.push(0);
        }
        self.align();
        Ok(())
    }

    fn container(&mut self, value: &'v Value) -> Result<u32> {
        self.align();
        let offset = self.position();
        let mut deferred: Vec<(usize, &'v Value)> = Vec::new();

        match value {
            Value::Array(items) => {
                Self::check_entries(items.len(), "array")?;
                self.buf.write_u8(node::ARRAY)?;
                self.buf.write_u24::<E>(items.len() as u32)?;
                for item in items {
                    self.buf.write_u8(item.node_type())?;
                }
                self.align();
                for item in items {
                    self.slot(item, &mut deferred)?;
                }
            }
            Value::Hash(hash) => {
                Self::check_entries(hash.len(), "hash")?;
                self.buf.write_u8(node::HASH)?;
                self.buf.write_u24::<E>(hash.len() as u32)?;
                for (key, item) in hash {
                    let index = self
                        .keys
                        .binary_search(&key.as_str())
                        .map_err(|_| Error::InvalidValue(format!("hash key {:?} not collected", key)))?;
                    self.buf.write_u24::<E>(index as u32)?;
                    self.buf.write_u8(item.node_type())?;
                    self.slot(item, &mut deferred)?;
                }
            }
            _ => {
                return Err(Error::InvalidValue(
                    "expected a hash or an array".to_string(),
                ))
            }
        }

        for (slot, child) in deferred {
            let child_offset = if child.is_container() {
                self.container(child)?
            } else {
                self.out_of_line(child)?
            };
            E::write_u32(&mut self.buf[slot..slot + 4], child_offset);
        }
        Ok(offset)
    }

    /// Writes the 4-byte value cell of a container entry. Containers and
    /// 64-bit or binary values get a placeholder patched once their data is
    /// written.
    fn slot(&mut self, value: &'v Value, deferred: &mut Vec<(usize, &'v Value)>) -> Result<()> {
        let raw = match value {
            Value::Null => 0,
            Value::Bool(b) => *b as u32,
            Value::I32(v) => *v as u32,
            Value::F32(v) => v.to_bits(),
            Value::U32(v) => *v,
            Value::String(s) => self
                .strings
                .binary_search(&s.as_str())
                .map_err(|_| Error::InvalidValue(format!("string {:?} not collected", s)))?
                as u32,
            Value::I64(_) | Value::U64(_) | Value::F64(_) => {
                self.require_version(3, value)?;
                deferred.push((self.buf.len(), value));
                0
            }
            Value::Binary(_) => {
                self.require_version(4, value)?;
                deferred.push((self.buf.len(), value));
                0
            }
            Value::Array(_) | Value::Hash(_) => {
                deferred.push((self.buf.len(), value));
                0
            }
        };
        self.buf.write_u32::<E>(raw)?;
        Ok(())
    }

    fn require_version(&self, min: u16, value: &Value) -> Result<()> {
        if self.version < min {
            return Err(Error::InvalidValue(format!(
                "{:?} needs BYML version {} or later, writing version {}",
                value, min, self.version
            )));
        }
        Ok(())
    }

    fn out_of_line(&mut self, value: &Value) -> Result<u32> {
        self.align();
        let offset = self.position();
        match value {
            Value::I64(v) => self.buf.write_i64::<E>(*v)?,
            Value::U64(v) => self.buf.write_u64::<E>(*v)?,
            Value::F64(v) => self.buf.write_f64::<E>(*v)?,
            Value::Binary(bytes) => {
                self.buf.write_u32::<E>(bytes.len() as u32)?;
                self.buf.extend_from_slice(bytes);
            }
            other => {
                return Err(Error::InvalidValue(format!(
                    "{:?} is stored inline",
                    other
                )))
            }
        }
        Ok(offset)
    }
}
