pub mod archive;
pub mod compat;
pub mod config;
pub mod error;
pub mod field;
pub mod format;
pub mod metadata;
pub mod reader;
pub mod sink;
pub mod writer;

pub use archive::{GameArchive, SlotState};
pub use compat::{read_header, HeaderInfo};
pub use config::ArchiveConfig;
pub use error::{ErrorCategory, FieldDecodeError, SaveError};
pub use field::{ArrayElement, ArrayValue, FieldScalar, FieldType, FieldValue};
pub use format::{Version, ENGINE_VERSION};
pub use metadata::{GameMetadata, ModInfo};
pub use reader::{read_part_file, Field, ParsedSave, RecoveredSection, SectionHandle, SectionInfo};
pub use sink::{FlushedSection, PartFileSink, SectionSink};
pub use writer::{SectionWriter, MAX_SECTION_DEPTH};
