use std::fmt;

use serde::{Deserialize, Serialize};

/// Magic identifying an NGD save file ("NGDF" read as a little-endian u32).
pub const NGD_IDENT: u32 = u32::from_le_bytes(*b"NGDF");

/// Saves older than this major version cannot be read at all.
pub const MIN_READABLE_MAJOR: u16 = 1;

/// Version stamped into saves written by this build.
pub const ENGINE_VERSION: Version = Version {
    major: 1,
    update: 0,
    patch: 0,
};

/// Width of section and field name fields, terminator included.
pub const NAME_SIZE: usize = 128;

/// Width of a mod name in the metadata block, terminator included.
pub const MOD_NAME_SIZE: usize = 64;

/// Upper bound on the mod list; larger counts mark a corrupt header.
pub const MAX_MODS: u64 = 1024;

pub const HEADER_SIZE: usize = 20;
pub const METADATA_SIZE: usize = 28;
pub const MOD_RECORD_SIZE: usize = 76;
pub const SECTION_HEADER_SIZE: usize = 140;
pub const FIELD_HEADER_SIZE: usize = 144;

/// Byte offset of `section_count`, patched when the writer finalizes.
pub const SECTION_COUNT_OFFSET: u64 = 12;

/// Engine version packed as `{ u16 major, u16 update, u32 patch }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub update: u16,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u16, update: u16, patch: u32) -> Self {
        Self {
            major,
            update,
            patch,
        }
    }

    pub const fn to_bits(self) -> u64 {
        self.major as u64 | (self.update as u64) << 16 | (self.patch as u64) << 32
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self {
            major: bits as u16,
            update: (bits >> 16) as u16,
            patch: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.update, self.patch)
    }
}

/// Fixed part of the save header: validation block plus section count.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NgdHeader {
    pub ident: u32,
    pub version: u64,
    pub section_count: i64,
}

/// Fixed part of the game metadata block; `mod_count` mod records follow.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MetadataRecord {
    pub map_index: i32,
    pub highest_difficulty: i32,
    pub save_difficulty: i32,
    pub play_time_hours: u32,
    pub play_time_minutes: u32,
    pub mod_count: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModRecord {
    pub name: [u8; MOD_NAME_SIZE],
    pub version_major: i32,
    pub version_update: i32,
    pub version_patch: i32,
}

/// Section record header; `byte_size` bytes of fields follow.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SectionHeader {
    pub name: [u8; NAME_SIZE],
    pub name_length: i32,
    pub field_count: i32,
    pub byte_size: u32,
}

/// Field record header; `data_size` payload bytes follow.
///
/// `data_offset` is the payload's offset from the start of the section's
/// field block.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FieldHeader {
    pub name: [u8; NAME_SIZE],
    pub name_length: i32,
    pub type_tag: i32,
    pub data_size: i32,
    pub data_offset: i32,
}
