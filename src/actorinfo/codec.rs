use std::borrow::Cow;

use tracing::debug;

use super::Container;
use crate::byml::{self, Endian, Reader};
use crate::config::Config;
use crate::error::Result;
use crate::yaz0;
use crate::Error;

/// Low-level format facts learned on read and re-applied on write. None of
/// them are part of the decoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub big_endian: bool,
    pub compressed: bool,
    pub version: u16,
}

impl ContainerHeader {
    pub fn new(endian: Endian, compressed: bool, version: u16) -> Self {
        Self {
            big_endian: endian == Endian::Big,
            compressed,
            version,
        }
    }

    pub fn endian(&self) -> Endian {
        if self.big_endian {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// Reads and writes complete ActorInfo files:
/// `[optional Yaz0 envelope][BY|YB][BYML document]`.
#[derive(Debug, Clone, Default)]
pub struct ContainerCodec {
    config: Config,
}

impl ContainerCodec {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn decode(&self, data: &[u8]) -> Result<(ContainerHeader, Container)> {
        let compressed = yaz0::is_compressed(data);
        let data: Cow<[u8]> = if compressed {
            Cow::Owned(yaz0::decompress(data).map_err(Error::into_format_error)?)
        } else {
            Cow::Borrowed(data)
        };

        let endian = Endian::from_magic(&data).ok_or_else(|| {
            Error::InvalidFormat("expected a BY or YB magic marker".to_string())
        })?;

        let reader = Reader::new(&data)
            .map_err(Error::into_format_error)?
            .max_depth(self.config.max_depth);
        let version = reader.header().version;
        let document = reader.read().map_err(Error::into_format_error)?;
        let container = Container::from_document(document)?;

        let header = ContainerHeader::new(endian, compressed, version);
        debug!(?header, entries = container.len(), "Decoded container");
        Ok((header, container))
    }

    /// Encodes the whole container in memory; nothing is returned unless every
    /// step succeeded.
    pub fn encode(&self, header: &ContainerHeader, container: &Container) -> Result<Vec<u8>> {
        let data = byml::to_binary(&container.to_document(), header.endian(), header.version)?;
        let data = if header.compressed {
            yaz0::compress(&data, self.config.compression_level)?
        } else {
            data
        };

        debug!(?header, entries = container.len(), size = data.len(), "Encoded container");
        Ok(data)
    }
}

/// Decodes with the default configuration.
pub fn decode(data: &[u8]) -> Result<(ContainerHeader, Container)> {
    ContainerCodec::default().decode(data)
}

/// Encodes with the default configuration.
pub fn encode(header: &ContainerHeader, container: &Container) -> Result<Vec<u8>> {
    ContainerCodec::default().encode(header, container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actorinfo::tests::record;
    use crate::byml::{Hash, Value};

    fn sample() -> Container {
        let mut fox = Hash::new();
        fox.insert("name".to_string(), "Fox".into());
        fox.insert("instSize".to_string(), Value::I32(2048));
        fox.insert("speed".to_string(), Value::F32(3.5));
        Container::from_records([Value::Hash(fox), record("Wolf"), record("Bear")]).unwrap()
    }

    #[test]
    fn test_round_trip_all_headers() {
        let container = sample();
        for endian in [Endian::Big, Endian::Little] {
            for compressed in [false, true] {
                let header = ContainerHeader::new(endian, compressed, 2);
                let bytes = encode(&header, &container).unwrap();
                assert_eq!(yaz0::is_compressed(&bytes), compressed);

                let (decoded_header, decoded) = decode(&bytes).unwrap();
                assert_eq!(decoded_header, header);
                assert_eq!(decoded, container);

                // A second pass yields the same document
                let again = encode(&decoded_header, &decoded).unwrap();
                assert_eq!(decode(&again).unwrap(), (header, container.clone()));
            }
        }
    }

    #[test]
    fn test_uncompressed_output_is_stable() {
        let header = ContainerHeader::new(Endian::Little, false, 2);
        let first = encode(&header, &sample()).unwrap();
        let (h, c) = decode(&first).unwrap();
        assert_eq!(encode(&h, &c).unwrap(), first);
    }

    #[test]
    fn test_version_is_preserved() {
        let header = ContainerHeader::new(Endian::Big, false, 3);
        let bytes = encode(&header, &sample()).unwrap();
        assert_eq!(decode(&bytes).unwrap().0.version, 3);
    }

    #[test]
    fn test_bad_magic() {
        let header = ContainerHeader::new(Endian::Big, false, 2);
        let mut bytes = encode(&header, &sample()).unwrap();
        bytes[..2].copy_from_slice(b"XY");
        assert!(matches!(decode(&bytes), Err(Error::InvalidFormat(_))));

        // Same check applies after decompression
        let compressed = yaz0::compress(&bytes, 3).unwrap();
        assert!(matches!(decode(&compressed), Err(Error::InvalidFormat(_))));

        assert!(matches!(decode(b""), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_codec_failures_are_invalid_format() {
        let header = ContainerHeader::new(Endian::Little, false, 2);
        let bytes = encode(&header, &sample()).unwrap();
        let truncated = &bytes[..bytes.len() - 6];
        assert!(matches!(decode(truncated), Err(Error::InvalidFormat(_))));

        let mut broken = yaz0::compress(&bytes, 3).unwrap();
        broken.truncate(broken.len() / 2);
        assert!(matches!(decode(&broken), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_wrong_top_level_shape() {
        let mut root = Hash::new();
        root.insert("Hashes".to_string(), Value::Array(vec![]));
        root.insert("Actors".to_string(), Value::Array(vec![]));
        root.insert("Version".to_string(), Value::I32(1));
        let bytes = byml::to_binary(&Value::Hash(root), Endian::Big, 2).unwrap();
        assert!(matches!(decode(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_depth_limit_from_config() {
        let mut nested = Value::Hash(Hash::new());
        for _ in 0..8 {
            let mut outer = Hash::new();
            outer.insert("inner".to_string(), nested);
            nested = Value::Hash(outer);
        }
        let mut fox = Hash::new();
        fox.insert("name".to_string(), "Fox".into());
        fox.insert("deep".to_string(), nested);
        let container = Container::from_records([Value::Hash(fox)]).unwrap();

        let header = ContainerHeader::new(Endian::Big, false, 2);
        let bytes = encode(&header, &container).unwrap();

        let strict = ContainerCodec::new(Config::new().max_depth(4));
        assert!(matches!(strict.decode(&bytes), Err(Error::InvalidFormat(_))));
        assert!(ContainerCodec::default().decode(&bytes).is_ok());
    }
}
