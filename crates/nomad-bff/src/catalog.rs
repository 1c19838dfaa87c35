//! Typed asset catalog built from an archive's chunk table.
//!
//! Chunks are classified by the subtype declared in their name (the file
//! extension the asset was packed from) into four fixed-capacity tables.

use std::collections::HashMap;

use serde::Serialize;

use crate::archive::Chunk;
use crate::error::BffError;

pub const MAX_TEXTURE_CHUNKS: usize = 128;
pub const MAX_LEVEL_CHUNKS: usize = 128;
pub const MAX_SOUND_CHUNKS: usize = 128;
pub const MAX_SCRIPT_CHUNKS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageFormat {
    Jpg,
    Bmp,
    Tga,
    Png,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SoundFormat {
    Ogg,
    Wav,
    Opus,
}

/// Level chunks are either Tiled maps or the tilesets they reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LevelKind {
    Map,
    Tileset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScriptFormat {
    /// Precompiled VM bytecode.
    Bytecode,
    /// Script source compiled at load time.
    Source,
}

/// Declared subtype of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChunkKind {
    Texture(ImageFormat),
    Level(LevelKind),
    Script(ScriptFormat),
    Sound(SoundFormat),
}

/// The four catalog tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssetClass {
    Texture,
    Level,
    Script,
    Sound,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Texture,
        AssetClass::Level,
        AssetClass::Script,
        AssetClass::Sound,
    ];

    pub fn capacity(self) -> usize {
        match self {
            AssetClass::Texture => MAX_TEXTURE_CHUNKS,
            AssetClass::Level => MAX_LEVEL_CHUNKS,
            AssetClass::Script => MAX_SCRIPT_CHUNKS,
            AssetClass::Sound => MAX_SOUND_CHUNKS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Texture => "texture",
            AssetClass::Level => "level",
            AssetClass::Script => "script",
            AssetClass::Sound => "sound",
        }
    }
}

impl ChunkKind {
    /// Classify a chunk by the extension in its name.
    pub fn classify(name: &str) -> Option<ChunkKind> {
        let (_, ext) = name.rsplit_once('.')?;
        let kind = match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ChunkKind::Texture(ImageFormat::Jpg),
            "bmp" => ChunkKind::Texture(ImageFormat::Bmp),
            "tga" => ChunkKind::Texture(ImageFormat::Tga),
            "png" => ChunkKind::Texture(ImageFormat::Png),
            "tmj" => ChunkKind::Level(LevelKind::Map),
            "tsj" => ChunkKind::Level(LevelKind::Tileset),
            "qvm" => ChunkKind::Script(ScriptFormat::Bytecode),
            "as" => ChunkKind::Script(ScriptFormat::Source),
            "ogg" => ChunkKind::Sound(SoundFormat::Ogg),
            "wav" => ChunkKind::Sound(SoundFormat::Wav),
            "opus" => ChunkKind::Sound(SoundFormat::Opus),
            _ => return None,
        };
        Some(kind)
    }

    pub fn class(self) -> AssetClass {
        match self {
            ChunkKind::Texture(_) => AssetClass::Texture,
            ChunkKind::Level(_) => AssetClass::Level,
            ChunkKind::Script(_) => AssetClass::Script,
            ChunkKind::Sound(_) => AssetClass::Sound,
        }
    }
}

/// Strip the extension from a chunk name: `"level1.tmj"` -> `"level1"`.
pub fn asset_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[derive(Debug, Default)]
struct CatalogTable {
    entries: Vec<usize>,
    by_name: HashMap<String, usize>,
}

impl CatalogTable {
    fn insert(&mut self, name: &str, chunk_index: usize) {
        self.entries.push(chunk_index);
        self.by_name.insert(name.to_string(), chunk_index);

        let stem = asset_stem(name);
        if stem != name {
            if let Some(&existing) = self.by_name.get(stem) {
                if existing != chunk_index {
                    log::warn!("'{name}' shares the name '{stem}' with an earlier chunk; keeping the first");
                }
            } else {
                self.by_name.insert(stem.to_string(), chunk_index);
            }
        }
    }
}

/// Chunk indices grouped by asset class, keyed by name with and without extension.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    textures: CatalogTable,
    levels: CatalogTable,
    scripts: CatalogTable,
    sounds: CatalogTable,
}

impl AssetCatalog {
    /// Classify every chunk. Exceeding a table's capacity fails the whole build.
    pub fn build(chunks: &[Chunk]) -> Result<Self, BffError> {
        let mut catalog = AssetCatalog::default();

        for (index, chunk) in chunks.iter().enumerate() {
            let Some(kind) = chunk.kind else {
                continue;
            };
            let class = kind.class();
            let table = catalog.table_mut(class);
            if table.entries.len() >= class.capacity() {
                return Err(BffError::CatalogFull {
                    class: class.label(),
                    capacity: class.capacity(),
                });
            }
            table.insert(&chunk.name, index);
        }

        Ok(catalog)
    }

    /// Index into the archive's chunk list, if `name` is catalogued under `class`.
    pub fn lookup(&self, class: AssetClass, name: &str) -> Option<usize> {
        self.table(class).by_name.get(name).copied()
    }

    pub fn len(&self, class: AssetClass) -> usize {
        self.table(class).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        AssetClass::ALL.iter().all(|&class| self.len(class) == 0)
    }

    /// Chunk indices of one class in archive order.
    pub fn entries(&self, class: AssetClass) -> &[usize] {
        &self.table(class).entries
    }

    fn table(&self, class: AssetClass) -> &CatalogTable {
        match class {
            AssetClass::Texture => &self.textures,
            AssetClass::Level => &self.levels,
            AssetClass::Script => &self.scripts,
            AssetClass::Sound => &self.sounds,
        }
    }

    fn table_mut(&mut self, class: AssetClass) -> &mut CatalogTable {
        match class {
            AssetClass::Texture => &mut self.textures,
            AssetClass::Level => &mut self.levels,
            AssetClass::Script => &mut self.scripts,
            AssetClass::Sound => &mut self.sounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(name: &str) -> Chunk {
        Chunk {
            name: name.to_string(),
            offset: 0,
            kind: ChunkKind::classify(name),
            data: Vec::new(),
        }
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(
            ChunkKind::classify("gun.png"),
            Some(ChunkKind::Texture(ImageFormat::Png))
        );
        assert_eq!(
            ChunkKind::classify("WALL.JPEG"),
            Some(ChunkKind::Texture(ImageFormat::Jpg))
        );
        assert_eq!(
            ChunkKind::classify("level1.tmj"),
            Some(ChunkKind::Level(LevelKind::Map))
        );
        assert_eq!(
            ChunkKind::classify("tiles.tsj"),
            Some(ChunkKind::Level(LevelKind::Tileset))
        );
        assert_eq!(
            ChunkKind::classify("boss.qvm"),
            Some(ChunkKind::Script(ScriptFormat::Bytecode))
        );
        assert_eq!(
            ChunkKind::classify("music.opus"),
            Some(ChunkKind::Sound(SoundFormat::Opus))
        );
        assert_eq!(ChunkKind::classify("readme.txt"), None);
        assert_eq!(ChunkKind::classify("noext"), None);
    }

    #[test]
    fn test_asset_stem() {
        assert_eq!(asset_stem("level1.tmj"), "level1");
        assert_eq!(asset_stem("a.b.png"), "a.b");
        assert_eq!(asset_stem(".hidden"), ".hidden");
        assert_eq!(asset_stem("plain"), "plain");
    }

    #[test]
    fn test_build_groups_by_class() {
        let chunks = vec![chunk("level1.tmj"), chunk("gun.png"), chunk("notes.txt")];
        let catalog = AssetCatalog::build(&chunks).expect("build");

        assert_eq!(catalog.lookup(AssetClass::Level, "level1"), Some(0));
        assert_eq!(catalog.lookup(AssetClass::Level, "level1.tmj"), Some(0));
        assert_eq!(catalog.lookup(AssetClass::Texture, "gun"), Some(1));
        assert_eq!(catalog.lookup(AssetClass::Texture, "level1"), None);
        assert_eq!(catalog.len(AssetClass::Sound), 0);
        assert_eq!(catalog.entries(AssetClass::Texture), &[1]);
    }

    #[test]
    fn test_stem_collision_keeps_first() {
        let chunks = vec![chunk("gun.png"), chunk("gun.tga")];
        let catalog = AssetCatalog::build(&chunks).expect("build");

        assert_eq!(catalog.lookup(AssetClass::Texture, "gun"), Some(0));
        assert_eq!(catalog.lookup(AssetClass::Texture, "gun.tga"), Some(1));
        assert_eq!(catalog.len(AssetClass::Texture), 2);
    }

    #[test]
    fn test_capacity_exceeded_fails() {
        let chunks: Vec<Chunk> = (0..=MAX_SCRIPT_CHUNKS)
            .map(|i| chunk(&format!("script{i}.as")))
            .collect();
        let result = AssetCatalog::build(&chunks);
        assert!(matches!(
            result,
            Err(BffError::CatalogFull {
                class: "script",
                capacity: MAX_SCRIPT_CHUNKS
            })
        ));
    }
}
