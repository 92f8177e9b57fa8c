//! Error types for configuration and save data

use std::{error::Error, fmt::Display, io};

/// Rejected configuration, raised before the scheduler starts
#[derive(Debug)]
pub enum ConfigError {
    /// Frame rate must be strictly positive
    InvalidFps(i32),
    Read(io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidFps(fps) => write!(f, "invalid fps {fps}, must be > 0"),
            ConfigError::Read(err) => write!(f, "read config: {err}"),
            ConfigError::Parse(err) => write!(f, "parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::InvalidFps(_) => None,
            ConfigError::Read(source) => Some(source),
            ConfigError::Parse(source) => Some(source),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Failure reading or writing a save record
#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    /// Record ended before a field could be read
    Truncated { needed: usize, remaining: usize },
    /// Flag byte other than 0 or 1
    InvalidFlag(u8),
    UnknownBlockKind(i32),
    InvalidColor(i32),
    InvalidGridCell { row: i32, column: i32 },
    /// Destroyed count negative or more blocks than the grid holds
    InvalidDestroyedCount { destroyed: i32, surviving: usize },
    /// Bytes left over after the block list
    TrailingBytes(usize),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(err) => write!(f, "save i/o: {err}"),
            PersistError::Truncated { needed, remaining } => write!(
                f,
                "save record truncated: needed {needed} bytes, {remaining} remaining"
            ),
            PersistError::InvalidFlag(byte) => write!(f, "invalid flag byte {byte:#04x}"),
            PersistError::UnknownBlockKind(kind) => write!(f, "unknown block kind {kind}"),
            PersistError::InvalidColor(index) => write!(f, "color index {index} out of range"),
            PersistError::InvalidGridCell { row, column } => {
                write!(f, "block cell ({row}, {column}) outside the grid")
            }
            PersistError::InvalidDestroyedCount {
                destroyed,
                surviving,
            } => write!(
                f,
                "destroyed count {destroyed} impossible with {surviving} surviving blocks"
            ),
            PersistError::TrailingBytes(count) => {
                write!(f, "{count} unexpected bytes after block list")
            }
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersistError::Io(source) => Some(source),
            PersistError::Truncated { .. }
            | PersistError::InvalidFlag(_)
            | PersistError::UnknownBlockKind(_)
            | PersistError::InvalidColor(_)
            | PersistError::InvalidGridCell { .. }
            | PersistError::InvalidDestroyedCount { .. }
            | PersistError::TrailingBytes(_) => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(err: io::Error) -> Self {
        PersistError::Io(err)
    }
}
