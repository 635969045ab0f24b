use std::fmt;
use std::io;

use carta_blocks::PaletteError;
use carta_image::ImageError;
use carta_world::{ParseError, WorldError};

/// Everything that can end a run with exit code 1. User-visible failure is
/// one diagnostic line (or an error frame in binary progress mode).
#[derive(Debug)]
pub enum Error {
    /// Bad flag or flag value.
    Config(String),
    /// The world directory is unusable (missing manifest, empty, unreadable).
    World(String),
    /// A chunk failed to decode under `--require-all` or pedantic scanning.
    Parse(ParseError),
    /// Projection produced an impossible canvas; indicates a bug.
    Render(String),
    /// Surface, PNG, palette, or marker file I/O.
    Io(String),
    /// The TTF file is missing or unreadable.
    Font(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(m) => write!(f, "{}", m),
            Error::World(m) => write!(f, "{}", m),
            Error::Parse(e) => write!(f, "Parser error: {}", e),
            Error::Render(m) => write!(f, "Render error: {}", m),
            Error::Io(m) => write!(f, "{}", m),
            Error::Font(m) => write!(f, "{}", m),
        }
    }
}

impl std::error::Error for Error {}

impl From<WorldError> for Error {
    fn from(e: WorldError) -> Self {
        match e {
            WorldError::Parse(p) => Error::Parse(p),
            WorldError::Io(io) => Error::World(format!("world scan failed: {}", io)),
            WorldError::Empty(p) => Error::World(format!("no chunks found under {}", p.display())),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<ImageError> for Error {
    fn from(e: ImageError) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<PaletteError> for Error {
    fn from(e: PaletteError) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
