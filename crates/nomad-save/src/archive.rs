//! Numbered save slots on top of a [`Storage`].
//!
//! `GameArchive` is an explicit context object: it owns the storage handle,
//! the configuration, the set of used slots and a per-slot cache. Two cache
//! levels exist. A metadata-only entry comes from [`GameArchive::load_partial`]
//! and never touches section bytes; a full entry is a [`ParsedSave`].

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use nomad_core::{DiskStorage, Storage};

use crate::compat::read_header;
use crate::config::ArchiveConfig;
use crate::error::SaveError;
use crate::metadata::GameMetadata;
use crate::reader::ParsedSave;
use crate::sink::{is_part_file_of, PartFileSink};
use crate::writer::SectionWriter;

/// What the archive currently knows about a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unused,
    /// A save file exists but nothing is cached.
    Stored,
    /// Only the metadata block is cached.
    Metadata,
    /// The whole save is parsed and cached.
    Full,
}

pub struct GameArchive<S: Storage> {
    storage: S,
    config: ArchiveConfig,
    used: BTreeSet<u64>,
    partial: HashMap<u64, GameMetadata>,
    full: HashMap<u64, ParsedSave>,
}

impl GameArchive<DiskStorage> {
    /// Open the archive in `config.save_dir`, creating the directory if needed.
    pub fn open(config: ArchiveConfig) -> Result<Self, SaveError> {
        let dir = config.save_dir.display().to_string();
        let storage = DiskStorage::new(&config.save_dir).map_err(SaveError::io(&dir))?;
        Self::new(storage, config)
    }
}

impl<S: Storage> GameArchive<S> {
    /// Scan `storage` for existing slot files.
    pub fn new(storage: S, config: ArchiveConfig) -> Result<Self, SaveError> {
        config.validate()?;
        let files = storage.list().map_err(SaveError::io("<save directory>"))?;
        let used: BTreeSet<u64> = files
            .iter()
            .filter_map(|file| config.slot_from_file_name(file))
            .collect();
        log::info!(
            "save archive ready: {} of {} slots in use",
            used.len(),
            config.max_slots
        );

        Ok(Self {
            storage,
            config,
            used,
            partial: HashMap::new(),
            full: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn num_used_save_slots(&self) -> usize {
        self.used.len()
    }

    pub fn slot_is_used(&self, slot: u64) -> bool {
        self.used.contains(&slot)
    }

    /// File names of every used slot, in slot order.
    pub fn save_files(&self) -> Vec<String> {
        self.used
            .iter()
            .map(|&slot| self.config.slot_file_name(slot))
            .collect()
    }

    pub fn slot_state(&self, slot: u64) -> SlotState {
        if self.full.contains_key(&slot) {
            SlotState::Full
        } else if self.partial.contains_key(&slot) {
            SlotState::Metadata
        } else if self.used.contains(&slot) {
            SlotState::Stored
        } else {
            SlotState::Unused
        }
    }

    /// Drop whatever is cached for `slot`.
    pub fn evict(&mut self, slot: u64) {
        let had_full = self.full.remove(&slot).is_some();
        let had_partial = self.partial.remove(&slot).is_some();
        if had_full || had_partial {
            log::debug!("slot {slot}: evicted from cache");
        }
    }

    fn check_slot(&self, slot: u64) -> Result<(), SaveError> {
        if slot >= self.config.max_slots {
            return Err(SaveError::SlotOutOfRange {
                slot,
                max: self.config.max_slots - 1,
            });
        }
        Ok(())
    }

    fn check_used(&self, slot: u64) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        if !self.used.contains(&slot) {
            return Err(SaveError::SlotUnused(slot));
        }
        Ok(())
    }

    /// Load and cache the whole save in `slot`.
    pub fn load(&mut self, slot: u64) -> Result<&ParsedSave, SaveError> {
        self.check_used(slot)?;
        match self.full.entry(slot) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = self.config.slot_file_name(slot);
                let bytes = self.storage.read_all(&file).map_err(SaveError::io(&file))?;
                let save = ParsedSave::parse(&file, bytes, self.config.engine_version)?;
                self.partial.remove(&slot);
                log::debug!("slot {slot}: cached full save");
                Ok(entry.insert(save))
            }
        }
    }

    /// Metadata of the save in `slot`, reading only the header and metadata
    /// bytes when nothing is cached yet.
    pub fn load_partial(&mut self, slot: u64) -> Result<GameMetadata, SaveError> {
        self.check_used(slot)?;
        if let Some(save) = self.full.get(&slot) {
            return Ok(save.metadata().clone());
        }
        if let Some(metadata) = self.partial.get(&slot) {
            return Ok(metadata.clone());
        }

        let file = self.config.slot_file_name(slot);
        let mut reader = self.storage.open_read(&file).map_err(SaveError::io(&file))?;
        let header = read_header(&mut reader, self.config.engine_version)?;
        for warning in &header.warnings {
            log::warn!("{file}: {warning}");
        }
        log::debug!(
            "slot {slot}: cached metadata ({} header bytes read)",
            header.header_len
        );
        self.partial.insert(slot, header.metadata.clone());
        Ok(header.metadata)
    }

    /// Remove the save in `slot` with its part files. Deleting an unused slot
    /// is not an error.
    pub fn delete_slot(&mut self, slot: u64) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        self.evict(slot);

        let file = self.config.slot_file_name(slot);
        if self.storage.exists(&file) {
            self.storage.remove(&file).map_err(SaveError::io(&file))?;
        }
        self.remove_part_files(&self.config.slot_stem(slot))?;

        if self.used.remove(&slot) {
            log::info!("deleted save slot {slot}");
        }
        Ok(())
    }

    fn remove_part_files(&self, stem: &str) -> Result<(), SaveError> {
        let files = self.storage.list().map_err(SaveError::io("<save directory>"))?;
        for file in files.iter().filter(|f| is_part_file_of(stem, f)) {
            self.storage.remove(file).map_err(SaveError::io(file))?;
        }
        Ok(())
    }

    /// Replace the part files of `stem` with those written under `temp_stem`.
    fn promote_part_files(&self, temp_stem: &str, stem: &str) -> Result<(), SaveError> {
        self.remove_part_files(stem)?;
        let files = self.storage.list().map_err(SaveError::io("<save directory>"))?;
        for file in files.iter().filter(|f| is_part_file_of(temp_stem, f)) {
            let Some(rest) = file.strip_prefix(temp_stem) else {
                continue;
            };
            let target = format!("{stem}{rest}");
            self.storage
                .rename(file, &target)
                .map_err(SaveError::io(&target))?;
        }
        Ok(())
    }
}

impl<S: Storage + Clone + 'static> GameArchive<S> {
    /// Write a new save into `slot`.
    ///
    /// `write` receives a writer with the header and metadata already
    /// written; it emits sections and fields, and the archive finalizes.
    /// The save goes to a temporary file that replaces the slot file only
    /// after finalize succeeds, so a failed save leaves the previous one
    /// untouched. With `mod_safety` the part files are staged the same way
    /// and the previous ones are only replaced once the slot file is in
    /// place.
    pub fn save<F>(&mut self, slot: u64, metadata: &GameMetadata, write: F) -> Result<(), SaveError>
    where
        F: FnOnce(&mut SectionWriter<S::Writer>) -> Result<(), SaveError>,
    {
        self.check_slot(slot)?;
        let file = self.config.slot_file_name(slot);
        let temp = self.config.temp_file_name(slot);
        let stem = self.config.slot_stem(slot);
        let temp_stem = self.config.temp_part_stem(slot);

        if self.config.mod_safety {
            // leftovers from an interrupted save
            self.remove_part_files(&temp_stem)?;
        }

        let out = self.storage.create(&temp).map_err(SaveError::io(&temp))?;
        let written = self
            .write_save(out, metadata, &temp_stem, write)
            .and_then(|sections| {
                self.storage
                    .rename(&temp, &file)
                    .map_err(SaveError::io(&file))?;
                Ok(sections)
            });

        let sections = match written {
            Ok(sections) => sections,
            Err(err) => {
                if self.storage.exists(&temp) {
                    if let Err(rm) = self.storage.remove(&temp) {
                        log::warn!("could not remove {temp}: {rm}");
                    }
                }
                if self.config.mod_safety {
                    if let Err(rm) = self.remove_part_files(&temp_stem) {
                        log::warn!("could not remove staged part files of slot {slot}: {rm}");
                    }
                }
                return Err(err);
            }
        };

        self.evict(slot);
        self.used.insert(slot);
        if self.config.mod_safety {
            self.promote_part_files(&temp_stem, &stem)?;
        }
        log::info!("saved slot {slot} to {file} ({sections} sections)");
        Ok(())
    }

    fn write_save<F>(
        &self,
        out: S::Writer,
        metadata: &GameMetadata,
        part_stem: &str,
        write: F,
    ) -> Result<u64, SaveError>
    where
        F: FnOnce(&mut SectionWriter<S::Writer>) -> Result<(), SaveError>,
    {
        let mut writer =
            SectionWriter::create_with_version(out, metadata, self.config.engine_version)?;
        if self.config.mod_safety {
            writer.attach_sink(Box::new(PartFileSink::new(self.storage.clone(), part_stem)));
        }
        write(&mut writer)?;
        writer.finalize()?;
        Ok(writer.sections_written())
    }
}
