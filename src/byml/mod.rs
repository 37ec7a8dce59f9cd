//! BYML document model and binary codec.
//!
//! A BYML document is a tree of [`Value`]s rooted at a hash or an array. Hash
//! keys are kept in a `BTreeMap`, which mirrors the byte-wise key order the
//! binary format stores them in.

pub mod format;
pub mod header;
pub mod reader;
pub mod writer;

use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub use header::{Endian, Header};
pub use reader::{from_binary, Reader};
pub use writer::{to_binary, Writer};

/// Mapping node of a BYML document.
pub type Hash = BTreeMap<String, Value>;

/// Node type tags as they appear in the binary format.
pub(crate) mod node {
    pub const STRING: u8 = 0xA0;
    pub const BINARY: u8 = 0xA1;
    pub const ARRAY: u8 = 0xC0;
    pub const HASH: u8 = 0xC1;
    pub const STRING_TABLE: u8 = 0xC2;
    pub const BOOL: u8 = 0xD0;
    pub const I32: u8 = 0xD1;
    pub const F32: u8 = 0xD2;
    pub const U32: u8 = 0xD3;
    pub const I64: u8 = 0xD4;
    pub const U64: u8 = 0xD5;
    pub const F64: u8 = 0xD6;
    pub const NULL: u8 = 0xFF;
}

/// A node of a BYML document.
///
/// The tree owns all of its children, so `clone()` is a full deep copy: no
/// node of the copy is shared with the original.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Hash(Hash),
    Bool(bool),
    I32(i32),
    F32(f32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
}

/// Scalar kinds a textual value can be parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    UInt,
    Float,
    Bool,
}

impl Value {
    pub(crate) fn node_type(&self) -> u8 {
        match self {
            Value::Null => node::NULL,
            Value::String(_) => node::STRING,
            Value::Binary(_) => node::BINARY,
            Value::Array(_) => node::ARRAY,
            Value::Hash(_) => node::HASH,
            Value::Bool(_) => node::BOOL,
            Value::I32(_) => node::I32,
            Value::F32(_) => node::F32,
            Value::U32(_) => node::U32,
            Value::I64(_) => node::I64,
            Value::U64(_) => node::U64,
            Value::F64(_) => node::F64,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Hash(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut Hash> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Looks up a direct child: by key for hashes, by decimal position for
    /// arrays.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Hash(h) => h.get(segment),
            Value::Array(a) => segment.parse::<usize>().ok().and_then(|i| a.get(i)),
            _ => None,
        }
    }

    /// Parses command-line text into a scalar of the requested kind.
    pub fn parse_as(kind: ValueKind, text: &str) -> Result<Value> {
        let invalid = |what: &str| Error::InvalidValue(format!("'{}' is not {}", text, what));
        match kind {
            ValueKind::String => Ok(Value::String(text.to_string())),
            ValueKind::Int => text
                .parse::<i32>()
                .map(Value::I32)
                .map_err(|_| invalid("a signed 32-bit integer")),
            ValueKind::UInt => parse_u32(text)
                .map(Value::U32)
                .ok_or_else(|| invalid("an unsigned 32-bit integer")),
            ValueKind::Float => text
                .parse::<f32>()
                .map(Value::F32)
                .map_err(|_| invalid("a float")),
            ValueKind::Bool => match text {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid("a boolean")),
            },
        }
    }
}

fn parse_u32(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Hash> for Value {
    fn from(h: Hash) -> Self {
        Value::Hash(h)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}
