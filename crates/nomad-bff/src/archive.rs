use std::collections::HashSet;
use std::path::Path;

use nomad_core::{decode_name, ByteReader, Storage};

use crate::catalog::{
    asset_stem, AssetCatalog, AssetClass, ChunkKind, ImageFormat, LevelKind, ScriptFormat,
    SoundFormat,
};
use crate::compat;
use crate::error::BffError;
use crate::format::{BffHeader, ChunkRecord, CompressionMode, CHUNK_RECORD_SIZE};

/// One named payload from the chunk table.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub(crate) name: String,
    pub(crate) offset: u64,
    pub(crate) kind: Option<ChunkKind>,
    pub(crate) data: Vec<u8>,
}

impl Chunk {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the chunk record from the start of the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Declared subtype, `None` if the extension is not recognized.
    pub fn kind(&self) -> Option<ChunkKind> {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Texture<'a> {
    pub name: &'a str,
    pub format: ImageFormat,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct Level<'a> {
    pub name: &'a str,
    pub kind: LevelKind,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct Script<'a> {
    pub name: &'a str,
    pub format: ScriptFormat,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct Sound<'a> {
    pub name: &'a str,
    pub format: SoundFormat,
    pub data: &'a [u8],
}

/// A fully read BFF archive. Owns every chunk payload until dropped.
#[derive(Debug)]
pub struct BffArchive {
    header: BffHeader,
    compression: CompressionMode,
    chunks: Vec<Chunk>,
    catalog: AssetCatalog,
    warnings: Vec<String>,
}

impl BffArchive {
    /// Read and parse an archive from the filesystem.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BffError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| BffError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let archive = Self::from_bytes(&bytes)?;
        log::info!(
            "opened bff archive {} ({} chunks)",
            path.display(),
            archive.chunks.len()
        );
        Ok(archive)
    }

    /// Read and parse an archive through a storage adapter.
    pub fn open_from<S: Storage>(storage: &S, name: &str) -> Result<Self, BffError> {
        let bytes = storage.read_all(name).map_err(|source| BffError::Io {
            path: name.to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse an archive held in memory.
    ///
    /// Layout: header (34B) + `chunk_count` x (name[72] + size:i64 + payload).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BffError> {
        let mut reader = ByteReader::new(bytes);
        let header: BffHeader = reader.read_pod()?;
        let warnings = compat::validate_header(&header)?;
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let compression = CompressionMode::from_raw(header.compression)
            .ok_or(BffError::UnknownCompression(header.compression))?;
        let chunk_count = header.chunk_count as usize;

        // Never trust the header for the allocation size.
        let mut chunks = Vec::with_capacity(chunk_count.min(reader.remaining() / CHUNK_RECORD_SIZE));
        let mut seen = HashSet::with_capacity(chunks.capacity());

        for index in 0..chunk_count {
            let offset = reader.position() as u64;
            let record: ChunkRecord = reader.read_pod()?;

            let name = decode_name(&record.name)
                .map_err(|source| BffError::InvalidChunkName { index, source })?
                .to_string();

            let size = i64::from_le(record.size);
            let len = usize::try_from(size)
                .map_err(|_| BffError::InvalidChunkSize { index, size })?;
            let data = reader.read_bytes(len)?.to_vec();

            if !seen.insert(name.clone()) {
                return Err(BffError::DuplicateChunk(name));
            }

            let kind = ChunkKind::classify(&name);
            if kind.is_none() {
                log::warn!("chunk '{name}' has no recognized asset type; it will not be catalogued");
            }

            chunks.push(Chunk {
                name,
                offset,
                kind,
                data,
            });
        }

        if !reader.is_empty() {
            log::warn!(
                "{} trailing bytes after the last chunk were ignored",
                reader.remaining()
            );
        }

        let catalog = AssetCatalog::build(&chunks)?;

        Ok(Self {
            header,
            compression,
            chunks,
            catalog,
            warnings,
        })
    }

    pub fn header(&self) -> &BffHeader {
        &self.header
    }

    pub fn compression(&self) -> CompressionMode {
        self.compression
    }

    pub fn version(&self) -> i16 {
        self.header.version
    }

    /// Compatibility warnings raised while opening (version, compression).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Look up a raw chunk by its exact name.
    pub fn chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.name == name)
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    fn fetch(&self, class: AssetClass, name: &str) -> Option<&Chunk> {
        self.catalog
            .lookup(class, name)
            .or_else(|| self.catalog.lookup(class, asset_stem(name)))
            .map(|index| &self.chunks[index])
    }

    pub fn fetch_texture(&self, name: &str) -> Option<Texture<'_>> {
        let chunk = self.fetch(AssetClass::Texture, name)?;
        match chunk.kind {
            Some(ChunkKind::Texture(format)) => Some(Texture {
                name: &chunk.name,
                format,
                data: &chunk.data,
            }),
            _ => None,
        }
    }

    pub fn fetch_level(&self, name: &str) -> Option<Level<'_>> {
        let chunk = self.fetch(AssetClass::Level, name)?;
        match chunk.kind {
            Some(ChunkKind::Level(kind)) => Some(Level {
                name: &chunk.name,
                kind,
                data: &chunk.data,
            }),
            _ => None,
        }
    }

    pub fn fetch_script(&self, name: &str) -> Option<Script<'_>> {
        let chunk = self.fetch(AssetClass::Script, name)?;
        match chunk.kind {
            Some(ChunkKind::Script(format)) => Some(Script {
                name: &chunk.name,
                format,
                data: &chunk.data,
            }),
            _ => None,
        }
    }

    pub fn fetch_sound(&self, name: &str) -> Option<Sound<'_>> {
        let chunk = self.fetch(AssetClass::Sound, name)?;
        match chunk.kind {
            Some(ChunkKind::Sound(format)) => Some(Sound {
                name: &chunk.name,
                format,
                data: &chunk.data,
            }),
            _ => None,
        }
    }

    /// Release every payload. Equivalent to dropping the archive.
    pub fn close(self) {
        log::debug!("closing bff archive ({} chunks)", self.chunks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BFF_VERSION, HEADER_SIZE};
    use crate::writer::BffWriter;
    use nomad_core::MemoryStorage;

    fn scenario_archive() -> Vec<u8> {
        let mut writer = BffWriter::new(CompressionMode::None);
        writer
            .add_chunk("level1.tmj", br#"{"width":64}"#.to_vec())
            .expect("level");
        writer
            .add_chunk("gun.png", vec![0x89, b'P', b'N', b'G'])
            .expect("texture");
        writer.finish().expect("finish")
    }

    #[test]
    fn test_fetch_scenario() {
        let archive = BffArchive::from_bytes(&scenario_archive()).expect("open");

        let level = archive.fetch_level("level1").expect("level1");
        assert_eq!(level.name, "level1.tmj");
        assert_eq!(level.kind, LevelKind::Map);
        assert_eq!(level.data, br#"{"width":64}"#);

        let texture = archive.fetch_texture("gun").expect("gun");
        assert_eq!(texture.format, ImageFormat::Png);
        assert_eq!(texture.data, &[0x89, b'P', b'N', b'G']);

        assert!(archive.fetch_texture("level1").is_none());
        assert!(archive.fetch_sound("gun").is_none());
        assert!(archive.warnings().is_empty());
    }

    #[test]
    fn test_fetch_accepts_full_name() {
        let archive = BffArchive::from_bytes(&scenario_archive()).expect("open");
        assert!(archive.fetch_level("level1.tmj").is_some());
        assert!(archive.fetch_texture("gun.png").is_some());
    }

    #[test]
    fn test_scripts_and_sounds() {
        let mut writer = BffWriter::new(CompressionMode::None);
        writer.add_chunk("boss.qvm", vec![1, 2, 3]).expect("script");
        writer.add_chunk("shot.wav", vec![4, 5]).expect("sound");
        let archive = BffArchive::from_bytes(&writer.finish().expect("finish")).expect("open");

        let script = archive.fetch_script("boss").expect("script");
        assert_eq!(script.format, ScriptFormat::Bytecode);
        assert_eq!(script.data, &[1, 2, 3]);

        let sound = archive.fetch_sound("shot").expect("sound");
        assert_eq!(sound.format, SoundFormat::Wav);
    }

    #[test]
    fn test_chunk_offsets_follow_layout() {
        let archive = BffArchive::from_bytes(&scenario_archive()).expect("open");
        let chunks = archive.chunks();
        assert_eq!(chunks[0].offset(), HEADER_SIZE as u64);
        assert_eq!(
            chunks[1].offset(),
            (HEADER_SIZE + CHUNK_RECORD_SIZE + chunks[0].size()) as u64
        );
    }

    #[test]
    fn test_flipped_ident_or_magic_rejected() {
        let bytes = scenario_archive();
        for i in 0..16 {
            let mut corrupt = bytes.clone();
            corrupt[i] ^= 0xFF;
            let result = BffArchive::from_bytes(&corrupt);
            if i < 8 {
                assert!(matches!(result, Err(BffError::BadIdent(_))), "byte {i}");
            } else {
                assert!(matches!(result, Err(BffError::BadMagic(_))), "byte {i}");
            }
        }
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = scenario_archive();
        let result = BffArchive::from_bytes(&bytes[..HEADER_SIZE - 1]);
        assert!(matches!(result, Err(BffError::Truncated { offset: 0, .. })));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let bytes = scenario_archive();
        let result = BffArchive::from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(BffError::Truncated { .. })));
    }

    #[test]
    fn test_chunk_count_beyond_table_rejected() {
        let mut bytes = scenario_archive();
        bytes[16..24].copy_from_slice(&3i64.to_le_bytes());
        let result = BffArchive::from_bytes(&bytes);
        assert!(matches!(result, Err(BffError::Truncated { .. })));
    }

    #[test]
    fn test_negative_chunk_size_rejected() {
        let mut bytes = scenario_archive();
        let size_at = HEADER_SIZE + 72;
        bytes[size_at..size_at + 8].copy_from_slice(&(-5i64).to_le_bytes());
        let result = BffArchive::from_bytes(&bytes);
        assert!(matches!(
            result,
            Err(BffError::InvalidChunkSize { index: 0, size: -5 })
        ));
    }

    #[test]
    fn test_unterminated_name_rejected() {
        let mut bytes = scenario_archive();
        bytes[HEADER_SIZE..HEADER_SIZE + 72].fill(b'a');
        let result = BffArchive::from_bytes(&bytes);
        assert!(matches!(
            result,
            Err(BffError::InvalidChunkName { index: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_chunk_rejected() {
        let mut bytes = scenario_archive();
        // Rename the second chunk to match the first.
        let second = HEADER_SIZE + CHUNK_RECORD_SIZE + br#"{"width":64}"#.len();
        let mut name = [0u8; 72];
        name[..10].copy_from_slice(b"level1.tmj");
        bytes[second..second + 72].copy_from_slice(&name);

        let result = BffArchive::from_bytes(&bytes);
        assert!(matches!(result, Err(BffError::DuplicateChunk(ref n)) if n == "level1.tmj"));
    }

    #[test]
    fn test_version_mismatch_loads_with_warning() {
        let mut bytes = scenario_archive();
        bytes[32..34].copy_from_slice(&(BFF_VERSION + 1).to_le_bytes());
        let archive = BffArchive::from_bytes(&bytes).expect("should load with warning");
        assert_eq!(archive.warnings().len(), 1);
        assert!(archive.fetch_texture("gun").is_some());
    }

    #[test]
    fn test_unknown_subtype_kept_but_not_catalogued() {
        let mut writer = BffWriter::new(CompressionMode::None);
        writer.add_chunk("credits.txt", b"thanks".to_vec()).expect("chunk");
        let archive = BffArchive::from_bytes(&writer.finish().expect("finish")).expect("open");

        assert_eq!(archive.chunks().len(), 1);
        assert!(archive.chunk("credits.txt").is_some());
        assert!(archive.catalog().is_empty());
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = BffArchive::open("/nonexistent/definitely/missing.bff");
        assert!(matches!(result, Err(BffError::Io { .. })));
    }

    #[test]
    fn test_open_from_storage() {
        let storage = MemoryStorage::new();
        storage.insert("assets.bff", scenario_archive());
        let archive = BffArchive::open_from(&storage, "assets.bff").expect("open");
        assert_eq!(archive.chunks().len(), 2);

        let missing = BffArchive::open_from(&storage, "other.bff");
        assert!(matches!(missing, Err(BffError::Io { .. })));
    }
}
