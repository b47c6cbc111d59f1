use std::fmt;
use std::io;
use std::path::PathBuf;

use seat_core::SeatId;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Reading or writing a catalog export file.
    Io { path: PathBuf, source: io::Error },
    /// Catalog JSON that does not parse, or a catalog that will not serialize.
    Json(serde_json::Error),
    UnknownSeat(SeatId),
    SeatTaken(SeatId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            StoreError::Json(e) => write!(f, "invalid catalog JSON: {e}"),
            StoreError::UnknownSeat(id) => write!(f, "no seat with id {id}"),
            StoreError::SeatTaken(id) => write!(f, "seat {id} is already booked"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Io { source, .. } => Some(source),
            StoreError::Json(e) => Some(e),
            StoreError::UnknownSeat(_) | StoreError::SeatTaken(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
