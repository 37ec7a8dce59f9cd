use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    InvalidFormat(String),
    Decode(&'static str, io::Error),
    Encode(&'static str, io::Error),
    NotFound(String),
    AlreadyExists(String),
    FieldNotFound { name: String, field: String },
    InvalidValue(String),
}

impl Error {
    /// Folds low-level codec failures into `InvalidFormat`, leaving every other
    /// variant untouched.
    pub(crate) fn into_format_error(self) -> Self {
        match self {
            Error::Decode(..) | Error::Encode(..) => {
                Error::InvalidFormat(self.to_string())
            }
            other => other,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::InvalidFormat(msg) => write!(f, "Invalid file: {}", msg),
            Error::Decode(field, err) => write!(f, "Failed to decode {}: {}", field, err),
            Error::Encode(field, err) => write!(f, "Failed to encode {}: {}", field, err),
            Error::NotFound(name) => write!(f, "'{}' doesn't exist in this file", name),
            Error::AlreadyExists(name) => write!(f, "'{}' already exists", name),
            Error::FieldNotFound { name, field } => {
                write!(f, "Key '{}' doesn't exist in '{}'", field, name)
            }
            Error::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) | Error::Decode(_, err) | Error::Encode(_, err) => Some(err),
            _ => None,
        }
    }
}
