use std::cell::Cell;
use std::io::{self, Cursor, Read};
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use tracing::debug;

use super::header::{Endian, Header};
use super::{node, Hash, Value};
use crate::config::Config;
use crate::error::Result;
use crate::Error;

/// Decodes a BYML document, detecting the byte order from its magic.
pub fn from_binary(data: &[u8]) -> Result<Value> {
    Reader::new(data)?.read()
}

fn decode_err(what: &'static str) -> impl FnOnce(io::Error) -> Error {
    move |e| Error::Decode(what, e)
}

pub struct Reader<'a> {
    data: &'a [u8],
    header: Header,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = Header::try_from(data)?;
        Ok(Self {
            data,
            header,
            max_depth: Config::default().max_depth,
        })
    }

    /// Limits how deeply containers may nest before decoding is refused.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn read(&self) -> Result<Value> {
        debug!(
            endian = ?self.header.endian,
            version = self.header.version,
            size = self.data.len(),
            "Decoding BYML document"
        );
        match self.header.endian {
            Endian::Big => NodeReader::<BigEndian>::new(self)?.root(self.header.root_offset),
            Endian::Little => {
                NodeReader::<LittleEndian>::new(self)?.root(self.header.root_offset)
            }
        }
    }
}

/// Walks the node graph once the key and string tables are loaded.
///
/// Containers may be referenced more than once, so besides the depth limit
/// every visited container and entry is charged against a budget of one per
/// input byte.
struct NodeReader<'a, E: ByteOrder> {
    data: &'a [u8],
    keys: Vec<String>,
    strings: Vec<String>,
    max_depth: usize,
    budget: Cell<usize>,
    _order: PhantomData<E>,
}

impl<'a, E: ByteOrder> NodeReader<'a, E> {
    fn new(reader: &Reader<'a>) -> Result<Self> {
        let mut nodes = Self {
            data: reader.data,
            keys: Vec::new(),
            strings: Vec::new(),
            max_depth: reader.max_depth,
            budget: Cell::new(reader.data.len()),
            _order: PhantomData,
        };
        nodes.keys = nodes.string_table(reader.header.hash_key_table_offset, "hash key table")?;
        nodes.strings = nodes.string_table(reader.header.string_table_offset, "string table")?;
        Ok(nodes)
    }

    fn cursor(&self, offset: u32) -> Cursor<&'a [u8]> {
        let mut cursor = Cursor::new(self.data);
        cursor.set_position(offset as u64);
        cursor
    }

    fn string_table(&self, offset: u32, what: &'static str) -> Result<Vec<String>> {
        if offset == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = self.cursor(offset);
        let node_type = cursor.read_u8().map_err(decode_err(what))?;
        if node_type != node::STRING_TABLE {
            return Err(Error::InvalidFormat(format!(
                "expected {} at {:#x}, found node type {:#04x}",
                what, offset, node_type
            )));
        }

        let count = cursor.read_u24::<E>().map_err(decode_err(what))? as usize;
        let mut strings = Vec::new();
        for _ in 0..count {
            let relative = cursor.read_u32::<E>().map_err(decode_err(what))?;
            strings.push(self.c_string(offset as usize + relative as usize, what)?);
        }
        Ok(strings)
    }

    fn c_string(&self, start: usize, what: &'static str) -> Result<String> {
        let bytes = self.data.get(start..).ok_or_else(|| {
            Error::InvalidFormat(format!("{} entry points past the end at {:#x}", what, start))
        })?;
        let len = bytes.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::InvalidFormat(format!("unterminated {} entry at {:#x}", what, start))
        })?;
        std::str::from_utf8(&bytes[..len])
            .map(str::to_string)
            .map_err(|_| Error::InvalidFormat(format!("{} entry at {:#x} is not UTF-8", what, start)))
    }

    fn spend(&self, nodes: usize) -> Result<()> {
        let left = self.budget.get().checked_sub(nodes).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "document expands past {} nodes, containers are shared or cyclic",
                self.data.len()
            ))
        })?;
        self.budget.set(left);
        Ok(())
    }

    fn root(&self, offset: u32) -> Result<Value> {
        if offset == 0 {
            return Ok(Value::Null);
        }

        let node_type = self.cursor(offset).read_u8().map_err(decode_err("root node"))?;
        self.container(node_type, offset, 0)
    }

    fn container(&self, expected: u8, offset: u32, depth: usize) -> Result<Value> {
        if depth > self.max_depth {
            return Err(Error::InvalidFormat(format!(
                "containers nested deeper than {}",
                self.max_depth
            )));
        }

        let mut cursor = self.cursor(offset);
        let node_type = cursor.read_u8().map_err(decode_err("container type"))?;
        if node_type != expected {
            return Err(Error::InvalidFormat(format!(
                "node at {:#x} has type {:#04x}, expected {:#04x}",
                offset, node_type, expected
            )));
        }
        let count = cursor.read_u24::<E>().map_err(decode_err("container size"))? as usize;
        self.spend(count + 1)?;

        match node_type {
            node::ARRAY => {
                let mut types = vec![0u8; count];
                cursor
                    .read_exact(&mut types)
                    .map_err(decode_err("array node types"))?;

                cursor.set_position(offset as u64 + align4(4 + count) as u64);
                let mut items = Vec::with_capacity(count);
                for node_type in types {
                    let raw = cursor.read_u32::<E>().map_err(decode_err("array value"))?;
                    items.push(self.value(node_type, raw, depth)?);
                }
                Ok(Value::Array(items))
            }
            node::HASH => {
                let mut hash = Hash::new();
                for _ in 0..count {
                    let key_index = cursor.read_u24::<E>().map_err(decode_err("hash key"))?;
                    let node_type = cursor.read_u8().map_err(decode_err("hash node type"))?;
                    let raw = cursor.read_u32::<E>().map_err(decode_err("hash value"))?;

                    let key = self.keys.get(key_index as usize).ok_or_else(|| {
                        Error::InvalidFormat(format!("hash key index {} out of range", key_index))
                    })?;
                    hash.insert(key.clone(), self.value(node_type, raw, depth)?);
                }
                Ok(Value::Hash(hash))
            }
            other => Err(Error::InvalidFormat(format!(
                "expected a container at {:#x}, found node type {:#04x}",
                offset, other
            ))),
        }
    }

    fn value(&self, node_type: u8, raw: u32, depth: usize) -> Result<Value> {
        let value = match node_type {
            node::STRING => {
                let s = self.strings.get(raw as usize).ok_or_else(|| {
                    Error::InvalidFormat(format!("string index {} out of range", raw))
                })?;
                Value::String(s.clone())
            }
            node::BINARY => {
                let mut cursor = self.cursor(raw);
                let len = cursor.read_u32::<E>().map_err(decode_err("binary size"))? as usize;
                let start = raw as usize + 4;
                let bytes = self.data.get(start..start + len).ok_or_else(|| {
                    Error::InvalidFormat(format!("binary node at {:#x} is truncated", raw))
                })?;
                Value::Binary(bytes.to_vec())
            }
            node::ARRAY | node::HASH => self.container(node_type, raw, depth + 1)?,
            node::BOOL => Value::Bool(raw != 0),
            node::I32 => Value::I32(raw as i32),
            node::F32 => Value::F32(f32::from_bits(raw)),
            node::U32 => Value::U32(raw),
            node::I64 => Value::I64(
                self.cursor(raw)
                    .read_i64::<E>()
                    .map_err(decode_err("i64 value"))?,
            ),
            node::U64 => Value::U64(
                self.cursor(raw)
                    .read_u64::<E>()
                    .map_err(decode_err("u64 value"))?,
            ),
            node::F64 => Value::F64(
                self.cursor(raw)
                    .read_f64::<E>()
                    .map_err(decode_err("f64 value"))?,
            ),
            node::NULL => Value::Null,
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unknown node type {:#04x}",
                    other
                )))
            }
        };
        Ok(value)
    }
}

pub(crate) fn align4(n: usize) -> usize {
    (n + 3) & !3
}
