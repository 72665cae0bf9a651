use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogueError>;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalogue format mismatch: expected {expected}, found {found}")]
    FormatMismatch { expected: String, found: String },

    #[error("Capacity exceeded for {what}: limit is {limit}")]
    CapacityExceeded { what: String, limit: u64 },

    #[error("Invalid tiling scheme: {message}")]
    InvalidTiling { message: String },

    #[error("Tile {tile_id} out of range (catalogue has {tile_count} tiles)")]
    TileOutOfRange { tile_id: u32, tile_count: u32 },

    #[error("Catalogue file truncated: {message}")]
    Truncated { message: String },

    #[error("Text source changed between converter passes: tile {tile_id} expected {expected} records")]
    SourceChanged { tile_id: u32, expected: u32 },

    #[error("Invalid magnitude request: {message}")]
    InvalidRequest { message: String },

    #[error("Binary catalogue {path:?} still unusable after rebuild: {message}")]
    RebuildFailed { path: PathBuf, message: String },
}

impl CatalogueError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn format_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::FormatMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn capacity(what: impl Into<String>, limit: u64) -> Self {
        Self::CapacityExceeded {
            what: what.into(),
            limit,
        }
    }

    pub fn invalid_tiling(message: impl Into<String>) -> Self {
        Self::InvalidTiling {
            message: message.into(),
        }
    }

    pub fn truncated(message: impl Into<String>) -> Self {
        Self::Truncated {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn rebuild_failed(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::RebuildFailed {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// True for errors that `CatalogueStore::open` answers with a rebuild.
    pub fn is_stale_file(&self) -> bool {
        match self {
            Self::FormatMismatch { .. } | Self::Truncated { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
