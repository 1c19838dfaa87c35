pub mod cursor;
pub mod error;
pub mod name;
pub mod storage;

pub use cursor::ByteReader;
pub use error::LayoutError;
pub use name::{decode_name, encode_name};
pub use storage::{DiskStorage, MemoryStorage, Storage};
