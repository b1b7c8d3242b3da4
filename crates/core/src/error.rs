use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog could not be opened: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("catalog query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("folder hierarchy loops back on folder {0}")]
    FolderCycle(i64),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    /// The encoded EXIF block does not fit into the APP1 segment budget.
    #[error("metadata segment too large: {size} bytes (limit {limit})")]
    SegmentTooLarge { size: usize, limit: usize },
    #[error("JPEG structure could not be parsed: {0}")]
    Jpeg(String),
    #[error("EXIF encoding failed: {0}")]
    Exif(#[from] exif::Error),
    #[error("metadata I/O failed: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MetadataError {
    pub fn is_segment_overflow(&self) -> bool {
        matches!(self, MetadataError::SegmentTooLarge { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MetadataError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Open(CatalogError),
    #[error("user directory could not be built: {0}")]
    UserDirectory(#[source] CatalogError),
    #[error("folder hierarchy could not be loaded: {0}")]
    Folders(#[source] CatalogError),
    #[error("content records could not be read: {0}")]
    Content(#[source] CatalogError),
}
