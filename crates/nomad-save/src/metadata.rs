use nomad_core::{decode_name, encode_name, ByteReader};
use serde::Serialize;

use crate::error::SaveError;
use crate::format::{MetadataRecord, ModRecord, MAX_MODS, METADATA_SIZE, MOD_RECORD_SIZE};

/// A mod that was active when the game was saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModInfo {
    pub name: String,
    pub version_major: i32,
    pub version_update: i32,
    pub version_patch: i32,
}

/// Summary shown by the slot picker. Stored right after the fixed header so
/// it can be read without touching any section bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameMetadata {
    pub map_index: i32,
    pub highest_difficulty: i32,
    pub save_difficulty: i32,
    pub play_time_hours: u32,
    pub play_time_minutes: u32,
    pub mods: Vec<ModInfo>,
}

impl GameMetadata {
    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        METADATA_SIZE + self.mods.len() * MOD_RECORD_SIZE
    }

    pub fn encode(&self) -> Result<Vec<u8>, SaveError> {
        let record = MetadataRecord {
            map_index: self.map_index,
            highest_difficulty: self.highest_difficulty,
            save_difficulty: self.save_difficulty,
            play_time_hours: self.play_time_hours,
            play_time_minutes: self.play_time_minutes,
            mod_count: self.mods.len() as u64,
        };

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(bytemuck::bytes_of(&record));
        for m in &self.mods {
            let record = ModRecord {
                name: encode_name(&m.name)?,
                version_major: m.version_major,
                version_update: m.version_update,
                version_patch: m.version_patch,
            };
            out.extend_from_slice(bytemuck::bytes_of(&record));
        }
        Ok(out)
    }

    /// Decode the fixed record. Returns the metadata without mods plus the
    /// number of mod records that follow.
    pub(crate) fn decode_fixed(bytes: &[u8]) -> Result<(Self, usize), SaveError> {
        let record: MetadataRecord = ByteReader::new(bytes).read_pod()?;
        let mod_count = record.mod_count;
        if mod_count > MAX_MODS {
            return Err(SaveError::CorruptHeader(format!(
                "mod count {mod_count} exceeds limit {MAX_MODS}"
            )));
        }
        let metadata = GameMetadata {
            map_index: record.map_index,
            highest_difficulty: record.highest_difficulty,
            save_difficulty: record.save_difficulty,
            play_time_hours: record.play_time_hours,
            play_time_minutes: record.play_time_minutes,
            mods: Vec::with_capacity(mod_count as usize),
        };
        Ok((metadata, mod_count as usize))
    }

    pub(crate) fn decode_mods(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
        let mut reader = ByteReader::new(bytes);
        while !reader.is_empty() {
            let record: ModRecord = reader.read_pod()?;
            let name = decode_name(&record.name)
                .map_err(|e| SaveError::CorruptHeader(format!("mod name: {e}")))?;
            self.mods.push(ModInfo {
                name: name.to_string(),
                version_major: record.version_major,
                version_update: record.version_update,
                version_patch: record.version_patch,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameMetadata {
        GameMetadata {
            map_index: 3,
            highest_difficulty: 2,
            save_difficulty: 1,
            play_time_hours: 12,
            play_time_minutes: 34,
            mods: vec![ModInfo {
                name: "better-guns".to_string(),
                version_major: 1,
                version_update: 4,
                version_patch: 2,
            }],
        }
    }

    #[test]
    fn test_encode_decode() {
        let metadata = sample();
        let bytes = metadata.encode().expect("encode");
        assert_eq!(bytes.len(), metadata.encoded_len());

        let (mut decoded, mods) = GameMetadata::decode_fixed(&bytes).expect("fixed");
        assert_eq!(mods, 1);
        decoded.decode_mods(&bytes[METADATA_SIZE..]).expect("mods");
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_mod_name_too_long_rejected() {
        let mut metadata = sample();
        metadata.mods[0].name = "m".repeat(64);
        assert!(matches!(metadata.encode(), Err(SaveError::InvalidName(_))));
    }

    #[test]
    fn test_absurd_mod_count_rejected() {
        let mut bytes = GameMetadata::default().encode().expect("encode");
        bytes[20..28].copy_from_slice(&(MAX_MODS + 1).to_le_bytes());
        assert!(matches!(
            GameMetadata::decode_fixed(&bytes),
            Err(SaveError::CorruptHeader(_))
        ));
    }
}
