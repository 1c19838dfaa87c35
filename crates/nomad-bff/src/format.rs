use serde::Serialize;

/// `('B'<<24) + ('F'<<16) + ('F'<<8) + 'I'`, stored as the first header field.
pub const BFF_IDENT: i64 = 0x4246_4649;

/// Sentinel stored after the ident; any other value marks a foreign file.
pub const HEADER_MAGIC: i64 = 0x5f37_59df;

pub const BFF_VERSION_MAJOR: i16 = 0;
pub const BFF_VERSION_MINOR: i16 = 1;

/// Format version written by this build: `(major << 8) + minor`.
pub const BFF_VERSION: i16 = (BFF_VERSION_MAJOR << 8) + BFF_VERSION_MINOR;

/// Size of the packed file header in bytes.
pub const HEADER_SIZE: usize = 34;

/// Width of the chunk name field, terminator included.
pub const CHUNK_NAME_SIZE: usize = 72;

/// Size of the `{ name, size }` record preceding every chunk payload.
pub const CHUNK_RECORD_SIZE: usize = 80;

/// BFF file header. Packed to 34 bytes to match the on-disk layout.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BffHeader {
    pub ident: i64,
    pub magic: i64,
    pub chunk_count: i64,
    pub compression: i64,
    pub version: i16,
}

impl BffHeader {
    pub fn new(chunk_count: i64, compression: CompressionMode) -> Self {
        Self {
            ident: BFF_IDENT,
            magic: HEADER_MAGIC,
            chunk_count,
            compression: compression as i64,
            version: BFF_VERSION,
        }
    }
}

/// Record header in front of each chunk payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkRecord {
    pub name: [u8; CHUNK_NAME_SIZE],
    pub size: i64,
}

/// Payload compression declared by the header.
///
/// Only `None` is produced by this crate; the other modes are recognized so
/// archives built by other tools can still be catalogued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i64)]
pub enum CompressionMode {
    None = 0,
    Bzip2 = 1,
    Zlib = 2,
}

impl CompressionMode {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Bzip2),
            2 => Some(Self::Zlib),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bzip2 => "bzip2",
            Self::Zlib => "zlib",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<BffHeader>(), HEADER_SIZE);
    }

    #[test]
    fn test_chunk_record_size() {
        assert_eq!(std::mem::size_of::<ChunkRecord>(), CHUNK_RECORD_SIZE);
    }

    #[test]
    fn test_ident_spells_bffi() {
        assert_eq!(&BFF_IDENT.to_be_bytes()[4..], b"BFFI");
        assert_eq!(BFF_VERSION, 1);
    }

    #[test]
    fn test_compression_from_raw() {
        assert_eq!(CompressionMode::from_raw(2), Some(CompressionMode::Zlib));
        assert_eq!(CompressionMode::from_raw(7), None);
    }
}
