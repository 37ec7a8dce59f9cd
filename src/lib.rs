pub mod actorinfo;
pub mod byml;
pub mod config;
pub mod error;
pub mod hasher;
pub mod source;
pub mod yaz0;

pub use actorinfo::{Container, ContainerCodec, ContainerHeader};
pub use config::Config;
pub use error::{Error, Result};
pub use hasher::{hash_name, HashKey};
pub use source::Source;
