//! Full-load parsing of NGD saves.
//!
//! Parsing only walks section headers. A section's field block is decoded
//! the first time anything asks for one of its fields, and the result is
//! cached for the lifetime of the [`ParsedSave`].

use std::cell::OnceCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3, Vec4};
use nomad_core::{decode_name, ByteReader};
use serde::Serialize;

use crate::compat::read_header;
use crate::error::SaveError;
use crate::field::{ArrayElement, FieldScalar, FieldType, FieldValue};
use crate::format::{FieldHeader, SectionHeader, Version, FIELD_HEADER_SIZE, SECTION_HEADER_SIZE};
use crate::metadata::GameMetadata;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Reference to a section of one particular [`ParsedSave`].
///
/// Handles from another save are rejected with `InvalidHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionHandle {
    owner: u64,
    index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// What the header scan records about a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub name: String,
    pub field_count: usize,
    pub byte_size: usize,
    /// Offset of the field block from the start of the file.
    pub offset: usize,
}

#[derive(Debug)]
struct SectionEntry {
    info: SectionInfo,
    fields: OnceCell<Vec<Field>>,
}

/// A fully loaded save.
#[derive(Debug)]
pub struct ParsedSave {
    owner: u64,
    name: String,
    version: Version,
    metadata: GameMetadata,
    warnings: Vec<String>,
    bytes: Vec<u8>,
    sections: Vec<SectionEntry>,
    index: HashMap<String, usize>,
}

impl ParsedSave {
    /// Validate the header and index every section. `name` is only used in
    /// diagnostics.
    pub fn parse(name: &str, bytes: Vec<u8>, expected: Version) -> Result<Self, SaveError> {
        let mut stream: &[u8] = &bytes;
        let header = read_header(&mut stream, expected)?;
        for warning in &header.warnings {
            log::warn!("{name}: {warning}");
        }

        let mut reader = ByteReader::new(&bytes);
        reader.read_bytes(header.header_len)?;

        let capacity = header
            .section_count
            .min(reader.remaining() / SECTION_HEADER_SIZE);
        let mut sections = Vec::with_capacity(capacity);
        for i in 0..header.section_count {
            let record: SectionHeader = reader.read_pod()?;
            let section_name = decode_name(&record.name).map_err(|e| SaveError::CorruptSection {
                section: format!("#{i}"),
                reason: e.to_string(),
            })?;
            let corrupt = |reason: String| SaveError::CorruptSection {
                section: section_name.to_string(),
                reason,
            };
            if usize::try_from(record.name_length).ok() != Some(section_name.len()) {
                return Err(corrupt(format!(
                    "name length {} does not match stored name",
                    record.name_length
                )));
            }
            let field_count = usize::try_from(record.field_count)
                .map_err(|_| corrupt(format!("negative field count {}", record.field_count)))?;

            let offset = reader.position();
            let byte_size = record.byte_size as usize;
            reader.read_bytes(byte_size)?;

            sections.push(SectionEntry {
                info: SectionInfo {
                    name: section_name.to_string(),
                    field_count,
                    byte_size,
                    offset,
                },
                fields: OnceCell::new(),
            });
        }

        if !reader.is_empty() {
            log::warn!(
                "{name}: {} trailing bytes after the last section",
                reader.remaining()
            );
        }

        let mut index = HashMap::with_capacity(sections.len());
        for (i, entry) in sections.iter().enumerate() {
            match index.entry(entry.info.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(_) => log::warn!(
                    "{name}: section '{}' appears more than once; lookups use the first",
                    entry.info.name
                ),
            }
        }

        log::info!(
            "loaded save {name} (version {}, {} sections)",
            header.version,
            sections.len()
        );

        Ok(Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            version: header.version,
            metadata: header.metadata,
            warnings: header.warnings,
            bytes,
            sections,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn metadata(&self) -> &GameMetadata {
        &self.metadata
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Every section in file order, including shadowed duplicates.
    pub fn sections(&self) -> impl Iterator<Item = (SectionHandle, &SectionInfo)> + '_ {
        self.sections.iter().enumerate().map(|(index, entry)| {
            (
                SectionHandle {
                    owner: self.owner,
                    index,
                },
                &entry.info,
            )
        })
    }

    /// Look up a section by name. The first section with that name wins.
    pub fn section(&self, name: &str) -> Option<SectionHandle> {
        self.index.get(name).map(|&index| SectionHandle {
            owner: self.owner,
            index,
        })
    }

    fn entry(&self, handle: SectionHandle) -> Result<&SectionEntry, SaveError> {
        if handle.owner != self.owner {
            return Err(SaveError::InvalidHandle);
        }
        self.sections.get(handle.index).ok_or(SaveError::InvalidHandle)
    }

    pub fn section_info(&self, handle: SectionHandle) -> Result<&SectionInfo, SaveError> {
        self.entry(handle).map(|entry| &entry.info)
    }

    /// True once the section's field block has been decoded.
    pub fn is_field_cache_populated(&self, handle: SectionHandle) -> bool {
        self.entry(handle)
            .map(|entry| entry.fields.get().is_some())
            .unwrap_or(false)
    }

    /// Decoded fields of a section, decoding on first access.
    pub fn fields(&self, handle: SectionHandle) -> Result<&[Field], SaveError> {
        let entry = self.entry(handle)?;
        if let Some(fields) = entry.fields.get() {
            return Ok(fields);
        }

        let info = &entry.info;
        let block = &self.bytes[info.offset..info.offset + info.byte_size];
        let decoded = decode_fields(&info.name, block, info.field_count)?;
        log::debug!(
            "{}: decoded {} fields of section '{}'",
            self.name,
            decoded.len(),
            info.name
        );
        Ok(entry.fields.get_or_init(|| decoded))
    }

    /// Find a field by name and type. The first field with that name wins.
    pub fn find_field(
        &self,
        name: &str,
        ty: FieldType,
        handle: SectionHandle,
    ) -> Result<&FieldValue, SaveError> {
        let fields = self.fields(handle)?;
        let field = fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SaveError::FieldNotFound {
                section: self.sections[handle.index].info.name.clone(),
                field: name.to_string(),
            })?;

        let found = field.value.field_type();
        if found != ty {
            return Err(SaveError::TypeMismatch {
                field: name.to_string(),
                expected: ty,
                found,
            });
        }
        Ok(&field.value)
    }

    pub fn load<T: FieldScalar>(&self, name: &str, handle: SectionHandle) -> Result<T, SaveError> {
        let value = self.find_field(name, T::TYPE, handle)?;
        T::from_value(value).ok_or_else(|| SaveError::TypeMismatch {
            field: name.to_string(),
            expected: T::TYPE,
            found: value.field_type(),
        })
    }

    pub fn load_byte(&self, name: &str, handle: SectionHandle) -> Result<u8, SaveError> {
        self.load(name, handle)
    }

    pub fn load_ushort(&self, name: &str, handle: SectionHandle) -> Result<u16, SaveError> {
        self.load(name, handle)
    }

    pub fn load_uint(&self, name: &str, handle: SectionHandle) -> Result<u32, SaveError> {
        self.load(name, handle)
    }

    pub fn load_ulong(&self, name: &str, handle: SectionHandle) -> Result<u64, SaveError> {
        self.load(name, handle)
    }

    pub fn load_char(&self, name: &str, handle: SectionHandle) -> Result<i8, SaveError> {
        self.load(name, handle)
    }

    pub fn load_short(&self, name: &str, handle: SectionHandle) -> Result<i16, SaveError> {
        self.load(name, handle)
    }

    pub fn load_int(&self, name: &str, handle: SectionHandle) -> Result<i32, SaveError> {
        self.load(name, handle)
    }

    pub fn load_long(&self, name: &str, handle: SectionHandle) -> Result<i64, SaveError> {
        self.load(name, handle)
    }

    pub fn load_float(&self, name: &str, handle: SectionHandle) -> Result<f32, SaveError> {
        self.load(name, handle)
    }

    pub fn load_vec2(&self, name: &str, handle: SectionHandle) -> Result<Vec2, SaveError> {
        self.load(name, handle)
    }

    pub fn load_vec3(&self, name: &str, handle: SectionHandle) -> Result<Vec3, SaveError> {
        self.load(name, handle)
    }

    pub fn load_vec4(&self, name: &str, handle: SectionHandle) -> Result<Vec4, SaveError> {
        self.load(name, handle)
    }

    pub fn load_string(&self, name: &str, handle: SectionHandle) -> Result<String, SaveError> {
        self.load(name, handle)
    }

    /// Load a string into at most `max_len` bytes, cut back to a char
    /// boundary.
    pub fn load_cstring(
        &self,
        name: &str,
        max_len: usize,
        handle: SectionHandle,
    ) -> Result<String, SaveError> {
        let s = self.load_string(name, handle)?;
        let mut end = s.len().min(max_len);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        Ok(s[..end].to_string())
    }

    pub fn load_array<T: ArrayElement>(
        &self,
        name: &str,
        handle: SectionHandle,
    ) -> Result<Vec<T>, SaveError> {
        let array = match self.find_field(name, FieldType::Array, handle)? {
            FieldValue::Array(array) => array,
            other => {
                return Err(SaveError::TypeMismatch {
                    field: name.to_string(),
                    expected: FieldType::Array,
                    found: other.field_type(),
                })
            }
        };
        array.to_vec::<T>().ok_or_else(|| SaveError::TypeMismatch {
            field: name.to_string(),
            expected: T::TYPE,
            found: array.element_type(),
        })
    }
}

/// Decode exactly `field_count` fields that must fill `block` completely.
fn decode_fields(section: &str, block: &[u8], field_count: usize) -> Result<Vec<Field>, SaveError> {
    let corrupt = |reason: String| SaveError::CorruptSection {
        section: section.to_string(),
        reason,
    };

    let mut reader = ByteReader::new(block);
    let mut fields = Vec::with_capacity(field_count.min(block.len() / FIELD_HEADER_SIZE));
    for i in 0..field_count {
        let header: FieldHeader = reader
            .read_pod()
            .map_err(|e| corrupt(format!("field {i}: {e}")))?;
        let name = decode_name(&header.name).map_err(|e| corrupt(format!("field {i} name: {e}")))?;
        if usize::try_from(header.name_length).ok() != Some(name.len()) {
            return Err(corrupt(format!(
                "field '{name}' name length {} does not match stored name",
                header.name_length
            )));
        }
        let ty = FieldType::from_tag(header.type_tag).ok_or_else(|| {
            corrupt(format!(
                "field '{name}' has unknown type tag {}",
                header.type_tag
            ))
        })?;
        if usize::try_from(header.data_offset).ok() != Some(reader.position()) {
            return Err(corrupt(format!(
                "field '{name}' data offset {} does not follow its header",
                header.data_offset
            )));
        }
        let size = usize::try_from(header.data_size)
            .map_err(|_| corrupt(format!("field '{name}' has negative size {}", header.data_size)))?;
        let payload = reader
            .read_bytes(size)
            .map_err(|e| corrupt(format!("field '{name}': {e}")))?;
        let value =
            FieldValue::decode(ty, payload).map_err(|reason| corrupt(format!("field '{name}': {reason}")))?;
        fields.push(Field {
            name: name.to_string(),
            value,
        });
    }

    if !reader.is_empty() {
        return Err(corrupt(format!(
            "{} bytes left over after {field_count} fields",
            reader.remaining()
        )));
    }
    Ok(fields)
}

/// A section salvaged from a `.prt` part file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredSection {
    pub name: String,
    pub fields: Vec<Field>,
}

/// Decode the single section record stored in a part file.
pub fn read_part_file(bytes: &[u8]) -> Result<RecoveredSection, SaveError> {
    let mut reader = ByteReader::new(bytes);
    let record: SectionHeader = reader.read_pod()?;
    let name = decode_name(&record.name).map_err(|e| SaveError::CorruptSection {
        section: "<part file>".to_string(),
        reason: e.to_string(),
    })?;
    let field_count = usize::try_from(record.field_count).map_err(|_| SaveError::CorruptSection {
        section: name.to_string(),
        reason: format!("negative field count {}", record.field_count),
    })?;
    let block = reader.read_bytes(record.byte_size as usize)?;
    let fields = decode_fields(name, block, field_count)?;
    Ok(RecoveredSection {
        name: name.to_string(),
        fields,
    })
}
