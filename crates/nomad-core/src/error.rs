/// Errors raised while walking a fixed binary layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("truncated data at offset {offset}: wanted {wanted} bytes, {available} available")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("name '{name}' is {len} bytes, maximum is {max}")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("name '{name}' contains a NUL byte at {position}")]
    InteriorNul { name: String, position: usize },

    #[error("fixed-width name field has no NUL terminator")]
    NameNotTerminated,

    #[error("name field is not valid UTF-8")]
    InvalidUtf8,
}
