use nomad_core::LayoutError;

use crate::field::FieldType;
use crate::format::Version;

/// Coarse classification of a `SaveError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Foreign or corrupt file. Nothing partially parsed is exposed.
    Format,
    /// Save written by an engine too old to be read.
    Version,
    /// Misused writer. The in-progress save is never finalized.
    Structural,
    /// Missing or mistyped field or slot. Recoverable.
    Lookup,
    Io,
    Config,
}

/// Why a field payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldDecodeError {
    #[error("{ty} payload is {found} bytes, expected {expected}")]
    WrongWidth {
        ty: FieldType,
        found: usize,
        expected: usize,
    },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("array header needs 8 bytes, got {0}")]
    ShortArrayHeader(usize),

    #[error("array element tag {0} is not a numeric type")]
    BadArrayElement(i32),

    #[error("array of {count} {element} elements has {found} payload bytes")]
    ArrayLength {
        count: u32,
        element: FieldType,
        found: usize,
    },
}

/// Errors that can occur during save/load operations.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("file isn't a save archive (ident {0:#010x})")]
    BadIdent(u32),

    #[error("save version {found} is too old (minimum major version {minimum})")]
    VersionTooOld { found: Version, minimum: u16 },

    #[error("truncated save at offset {offset}: wanted {wanted} bytes, {available} available")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("corrupt save header: {0}")]
    CorruptHeader(String),

    #[error("corrupt section '{section}': {reason}")]
    CorruptSection { section: String, reason: String },

    #[error("section stack overflow (maximum depth {max})")]
    StackOverflow { max: usize },

    #[error("end_section called with no open section")]
    StackUnderflow,

    #[error("field saved with no open section")]
    NoActiveSection,

    #[error("cannot finalize with {open} section(s) still open")]
    UnbalancedSections { open: usize },

    #[error("writer is already finalized")]
    WriterClosed,

    #[error("writer aborted after an earlier error")]
    WriterFailed,

    #[error("invalid name: {0}")]
    InvalidName(LayoutError),

    #[error("field '{field}' payload of {size} bytes is too large")]
    FieldTooLarge { field: String, size: usize },

    #[error("field '{field}' not found in section '{section}'")]
    FieldNotFound { section: String, field: String },

    #[error("field '{field}' is {found}, requested {expected}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    #[error("section handle does not belong to this save")]
    InvalidHandle,

    #[error("slot {slot} is out of range (maximum {max})")]
    SlotOutOfRange { slot: u64, max: u64 },

    #[error("slot {0} is not in use")]
    SlotUnused(u64),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while writing save: {0}")]
    Stream(#[from] std::io::Error),

    #[error("invalid archive configuration: {0}")]
    Config(String),
}

impl SaveError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SaveError::VersionTooOld { .. } => ErrorCategory::Version,
            SaveError::BadIdent(_)
            | SaveError::Truncated { .. }
            | SaveError::CorruptHeader(_)
            | SaveError::CorruptSection { .. } => ErrorCategory::Format,
            SaveError::StackOverflow { .. }
            | SaveError::StackUnderflow
            | SaveError::NoActiveSection
            | SaveError::UnbalancedSections { .. }
            | SaveError::WriterClosed
            | SaveError::WriterFailed
            | SaveError::InvalidName(_)
            | SaveError::FieldTooLarge { .. } => ErrorCategory::Structural,
            SaveError::FieldNotFound { .. }
            | SaveError::TypeMismatch { .. }
            | SaveError::InvalidHandle
            | SaveError::SlotOutOfRange { .. }
            | SaveError::SlotUnused(_) => ErrorCategory::Lookup,
            SaveError::Io { .. } | SaveError::Stream(_) => ErrorCategory::Io,
            SaveError::Config(_) => ErrorCategory::Config,
        }
    }

    pub(crate) fn io(path: &str) -> impl FnOnce(std::io::Error) -> SaveError + '_ {
        move |source| SaveError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl From<LayoutError> for SaveError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Truncated {
                offset,
                wanted,
                available,
            } => SaveError::Truncated {
                offset,
                wanted,
                available,
            },
            other => SaveError::InvalidName(other),
        }
    }
}
