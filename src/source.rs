use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;

/// Where a container is read from and written back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Read from stdin, write to stdout.
    Stdin,
    File(PathBuf),
}

impl Source {
    /// `-` selects stdin, anything else is a path.
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(arg))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Source::Stdin)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        let data = match self {
            Source::Stdin => {
                let mut data = Vec::new();
                io::stdin().lock().read_to_end(&mut data)?;
                data
            }
            Source::File(path) => fs::read(path)?,
        };
        debug!(source = %self, size = data.len(), "Read container");
        Ok(data)
    }

    /// Writes a fully encoded container in one call.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        match self {
            Source::Stdin => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()?;
            }
            Source::File(path) => {
                let mut file = fs::File::create(path)?;
                file.write_all(data)?;
                file.sync_all()?;
            }
        }
        debug!(source = %self, size = data.len(), "Wrote container");
        Ok(())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => write!(f, "<stdin>"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}
