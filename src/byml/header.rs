use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;
use crate::Error;

pub const HEADER_SIZE: usize = 16;

pub const MAGIC_BIG: [u8; 2] = *b"BY";
pub const MAGIC_LITTLE: [u8; 2] = *b"YB";

pub const MIN_VERSION: u16 = 2;
pub const MAX_VERSION: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Maps a 2-byte magic marker to its byte order.
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        match magic.get(..2)? {
            m if m == MAGIC_BIG => Some(Endian::Big),
            m if m == MAGIC_LITTLE => Some(Endian::Little),
            _ => None,
        }
    }

    pub fn magic(self) -> [u8; 2] {
        match self {
            Endian::Big => MAGIC_BIG,
            Endian::Little => MAGIC_LITTLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub endian: Endian,
    pub version: u16,
    pub hash_key_table_offset: u32,
    pub string_table_offset: u32,
    pub root_offset: u32,
}

impl Header {
    pub fn new(endian: Endian, version: u16) -> Self {
        Header {
            endian,
            version,
            hash_key_table_offset: 0,
            string_table_offset: 0,
            root_offset: 0,
        }
    }
}

impl TryInto<Vec<u8>> for &Header {
    type Error = Error;

    fn try_into(self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        HeaderEncoder::new(&mut buf).encode(self)?;
        Ok(buf)
    }
}

impl TryFrom<&[u8]> for Header {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "BYML header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        HeaderDecoder::new(bytes).decode()
    }
}

// Header decoder
pub struct HeaderDecoder<R: Read> {
    reader: R,
}

impl<R: Read> HeaderDecoder<R> {
    pub fn new(reader: R) -> Self {
        HeaderDecoder { reader }
    }

    pub fn decode(&mut self) -> Result<Header> {
        let mut magic = [0u8; 2];
        self.reader
            .read_exact(&mut magic)
            .map_err(|e| Error::Decode("magic", e))?;

        let endian = Endian::from_magic(&magic).ok_or_else(|| {
            Error::InvalidFormat(format!("unknown BYML magic {:02X?}", magic))
        })?;

        let header = match endian {
            Endian::Big => self.decode_fields::<BigEndian>(endian)?,
            Endian::Little => self.decode_fields::<LittleEndian>(endian)?,
        };

        if !(MIN_VERSION..=MAX_VERSION).contains(&header.version) {
            return Err(Error::InvalidFormat(format!(
                "unsupported BYML version {}",
                header.version
            )));
        }

        Ok(header)
    }

    fn decode_fields<E: ByteOrder>(&mut self, endian: Endian) -> Result<Header> {
        let version = self
            .reader
            .read_u16::<E>()
            .map_err(|e| Error::Decode("version", e))?;

        let hash_key_table_offset = self
            .reader
            .read_u32::<E>()
            .map_err(|e| Error::Decode("hash_key_table_offset", e))?;

        let string_table_offset = self
            .reader
            .read_u32::<E>()
            .map_err(|e| Error::Decode("string_table_offset", e))?;

        let root_offset = self
            .reader
            .read_u32::<E>()
            .map_err(|e| Error::Decode("root_offset", e))?;

        Ok(Header {
            endian,
            version,
            hash_key_table_offset,
            string_table_offset,
            root_offset,
        })
    }
}

// Header encoder
pub struct HeaderEncoder<W: Write> {
    writer: W,
}

impl<W: Write> HeaderEncoder<W> {
    pub fn new(writer: W) -> Self {
        HeaderEncoder { writer }
    }

    pub fn encode(&mut self, header: &Header) -> Result<()> {
        self.writer
            .write_all(&header.endian.magic())
            .map_err(|e| Error::Encode("magic", e))?;

        match header.endian {
            Endian::Big => self.encode_fields::<BigEndian>(header),
            Endian::Little => self.encode_fields::<LittleEndian>(header),
        }
    }

    fn encode_fields<E: ByteOrder>(&mut self, header: &Header) -> Result<()> {
        self.writer
            .write_u16::<E>(header.version)
            .map_err(|e| Error::Encode("version", e))?;

        self.writer
            .write_u32::<E>(header.hash_key_table_offset)
            .map_err(|e| Error::Encode("hash_key_table_offset", e))?;

        self.writer
            .write_u32::<E>(header.string_table_offset)
            .map_err(|e| Error::Encode("string_table_offset", e))?;

        self.writer
            .write_u32::<E>(header.root_offset)
            .map_err(|e| Error::Encode("root_offset", e))?;

        Ok(())
    }
}
