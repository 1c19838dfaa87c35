use nomad_core::LayoutError;

/// Errors that can occur while opening or building a BFF archive.
///
/// Every variant is fatal for the archive in question: no partially parsed
/// archive is ever handed out.
#[derive(Debug, thiserror::Error)]
pub enum BffError {
    #[error("failed to read archive {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while writing archive: {0}")]
    Write(#[from] std::io::Error),

    #[error("file isn't a bff archive (ident {0:#x})")]
    BadIdent(i64),

    #[error("header magic number is not correct ({0:#x})")]
    BadMagic(i64),

    #[error("bad chunk count {0}")]
    BadChunkCount(i64),

    #[error("unknown compression mode {0}")]
    UnknownCompression(i64),

    #[error("truncated archive at offset {offset}: wanted {wanted} bytes, {available} available")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("chunk {index} has invalid size {size}")]
    InvalidChunkSize { index: usize, size: i64 },

    #[error("chunk {index} has an invalid name: {source}")]
    InvalidChunkName {
        index: usize,
        #[source]
        source: LayoutError,
    },

    #[error("invalid chunk name: {0}")]
    InvalidName(LayoutError),

    #[error("duplicate chunk name '{0}'")]
    DuplicateChunk(String),

    #[error("too many {class} chunks (capacity {capacity})")]
    CatalogFull {
        class: &'static str,
        capacity: usize,
    },

    #[error("archive has no chunks")]
    EmptyArchive,
}

impl From<LayoutError> for BffError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Truncated {
                offset,
                wanted,
                available,
            } => BffError::Truncated {
                offset,
                wanted,
                available,
            },
            other => BffError::InvalidName(other),
        }
    }
}
