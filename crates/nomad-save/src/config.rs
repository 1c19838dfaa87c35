use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SaveError;
use crate::format::{Version, ENGINE_VERSION};

/// Where and how save slots are stored.
///
/// Slot `n` lives in `<save_dir>/<file_prefix><n>.<extension>`. Missing keys
/// in a RON file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub save_dir: PathBuf,
    pub file_prefix: String,
    pub extension: String,
    /// Slots are numbered `0..max_slots`.
    pub max_slots: u64,
    /// Also write every section to a `.prt` part file as it is flushed.
    pub mod_safety: bool,
    /// Version stamped into new saves and expected from loaded ones.
    pub engine_version: Version,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            file_prefix: "slot".to_string(),
            extension: "ngd".to_string(),
            max_slots: 10,
            mod_safety: false,
            engine_version: ENGINE_VERSION,
        }
    }
}

impl ArchiveConfig {
    pub fn from_ron_str(ron_str: &str) -> Result<Self, SaveError> {
        let options = ron::Options::default();
        let config: Self = options
            .from_str(ron_str)
            .map_err(|e| SaveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SaveError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_ron_str(&text)?;
        log::info!("loaded archive config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.max_slots == 0 {
            return Err(SaveError::Config("max_slots must be at least 1".into()));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['.', '/', '\\']) {
            return Err(SaveError::Config(format!(
                "file_prefix '{}' must be non-empty and contain no '.' or path separators",
                self.file_prefix
            )));
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(SaveError::Config(format!(
                "extension '{}' must be non-empty and contain no '.' or path separators",
                self.extension
            )));
        }
        Ok(())
    }

    /// `slot3`
    pub fn slot_stem(&self, slot: u64) -> String {
        format!("{}{slot}", self.file_prefix)
    }

    /// `slot3.ngd`
    pub fn slot_file_name(&self, slot: u64) -> String {
        format!("{}.{}", self.slot_stem(slot), self.extension)
    }

    /// `slot3.ngd.tmp`
    pub fn temp_file_name(&self, slot: u64) -> String {
        format!("{}.tmp", self.slot_file_name(slot))
    }

    /// `slot3_tmp`, the stem for part files of a save still in progress.
    pub fn temp_part_stem(&self, slot: u64) -> String {
        format!("{}_tmp", self.slot_stem(slot))
    }

    /// Inverse of [`Self::slot_file_name`]. Only the canonical spelling
    /// matches, so `slot03.ngd` is not slot 3. Ignores slots outside the
    /// configured range.
    pub fn slot_from_file_name(&self, file: &str) -> Option<u64> {
        let digits = file
            .strip_prefix(self.file_prefix.as_str())?
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().filter(|&slot| slot < self.max_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArchiveConfig::default();
        assert_eq!(config.save_dir, PathBuf::from("saves"));
        assert_eq!(config.max_slots, 10);
        assert!(!config.mod_safety);
        assert_eq!(config.engine_version, ENGINE_VERSION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = ArchiveConfig::from_ron_str(
            r#"(
                max_slots: 3,
                mod_safety: true,
                engine_version: (major: 1, update: 2, patch: 0),
            )"#,
        )
        .expect("should parse");
        assert_eq!(config.max_slots, 3);
        assert!(config.mod_safety);
        assert_eq!(config.engine_version, Version::new(1, 2, 0));
        assert_eq!(config.file_prefix, "slot");
    }

    #[test]
    fn test_malformed_ron_rejected() {
        assert!(matches!(
            ArchiveConfig::from_ron_str("(max_slots: \"many\""),
            Err(SaveError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ArchiveConfig::from_ron_str("(max_slots: 0)"),
            Err(SaveError::Config(_))
        ));
        assert!(matches!(
            ArchiveConfig::from_ron_str("(file_prefix: \"a.b\")"),
            Err(SaveError::Config(_))
        ));
    }

    #[test]
    fn test_file_names() {
        let config = ArchiveConfig::default();
        assert_eq!(config.slot_file_name(3), "slot3.ngd");
        assert_eq!(config.temp_file_name(3), "slot3.ngd.tmp");
        assert_eq!(config.temp_part_stem(3), "slot3_tmp");
        assert_eq!(config.slot_from_file_name("slot3_tmp.000_World.prt"), None);
        assert_eq!(config.slot_from_file_name("slot3.ngd"), Some(3));
        assert_eq!(config.slot_from_file_name("slot3.ngd.tmp"), None);
        assert_eq!(config.slot_from_file_name("slot12.ngd"), None);
        assert_eq!(config.slot_from_file_name("slot.ngd"), None);
        assert_eq!(config.slot_from_file_name("slot3.000_World.prt"), None);
        assert_eq!(config.slot_from_file_name("slot+3.ngd"), None);
        assert_eq!(config.slot_from_file_name("slot0.ngd"), Some(0));
        assert_eq!(config.slot_from_file_name("slot03.ngd"), None);
        assert_eq!(config.slot_from_file_name("slot00.ngd"), None);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ArchiveConfig::load("/nonexistent/archive.ron"),
            Err(SaveError::Config(_))
        ));
    }
}
