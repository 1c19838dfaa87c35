//! Observers attached at the section flush point.
//!
//! A sink sees each section's encoded bytes exactly as they were written to
//! the primary stream. Sinks never change what the primary stream receives.

use std::io::Write;

use nomad_core::Storage;

use crate::error::SaveError;

/// One section as it leaves the writer's stack.
#[derive(Debug, Clone, Copy)]
pub struct FlushedSection<'a> {
    pub name: &'a str,
    /// Nesting depth while the section was open (1 = top level).
    pub depth: usize,
    /// Zero-based index of the section in the primary stream.
    pub sequence: u64,
    /// Section header followed by its field block.
    pub bytes: &'a [u8],
}

pub trait SectionSink {
    fn section_flushed(&mut self, section: &FlushedSection<'_>) -> Result<(), SaveError>;
}

/// Writes every flushed section to its own `.prt` file for crash recovery.
///
/// Each part file holds a single section record and can be decoded with
/// [`crate::reader::read_part_file`] even if the primary save is damaged.
#[derive(Debug)]
pub struct PartFileSink<S: Storage> {
    storage: S,
    stem: String,
    written: Vec<String>,
}

impl<S: Storage> PartFileSink<S> {
    pub fn new(storage: S, stem: impl Into<String>) -> Self {
        Self {
            storage,
            stem: stem.into(),
            written: Vec::new(),
        }
    }

    /// Names of the part files produced so far.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}

/// Part file name for a section: `<stem>.<sequence>_<section>.prt`.
///
/// Characters outside `[A-Za-z0-9_-]` in the section name become `_`.
pub fn part_file_name(stem: &str, sequence: u64, section: &str) -> String {
    let clean: String = section
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.{sequence:03}_{clean}.prt")
}

/// True if `file` is a part file produced for `stem`.
pub fn is_part_file_of(stem: &str, file: &str) -> bool {
    file.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|rest| rest.ends_with(".prt"))
}

impl<S: Storage> SectionSink for PartFileSink<S> {
    fn section_flushed(&mut self, section: &FlushedSection<'_>) -> Result<(), SaveError> {
        let name = part_file_name(&self.stem, section.sequence, section.name);
        let mut out = self.storage.create(&name).map_err(SaveError::io(&name))?;
        out.write_all(section.bytes).map_err(SaveError::io(&name))?;
        out.flush().map_err(SaveError::io(&name))?;
        log::debug!("wrote part file {name} ({} bytes)", section.bytes.len());
        self.written.push(name);
        Ok(())
    }
}
