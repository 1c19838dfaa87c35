pub mod archive;
pub mod catalog;
pub mod compat;
pub mod error;
pub mod format;
pub mod writer;

pub use archive::{BffArchive, Chunk, Level, Script, Sound, Texture};
pub use catalog::{AssetCatalog, AssetClass, ChunkKind, ImageFormat, LevelKind, ScriptFormat, SoundFormat};
pub use error::BffError;
pub use format::{BffHeader, CompressionMode};
pub use writer::BffWriter;
