use std::collections::HashSet;
use std::io::Write;

use nomad_core::encode_name;

use crate::error::BffError;
use crate::format::{BffHeader, ChunkRecord, CompressionMode, CHUNK_NAME_SIZE};

/// Builds BFF archives from named payloads, in insertion order.
#[derive(Debug)]
pub struct BffWriter {
    compression: CompressionMode,
    version: Option<i16>,
    chunks: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl BffWriter {
    /// Payloads are always stored as given; `compression` is only recorded
    /// in the header.
    pub fn new(compression: CompressionMode) -> Self {
        Self {
            compression,
            version: None,
            chunks: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Override the header version (defaults to the current format version).
    pub fn with_version(mut self, version: i16) -> Self {
        self.version = Some(version);
        self
    }

    pub fn add_chunk(&mut self, name: &str, data: Vec<u8>) -> Result<&mut Self, BffError> {
        encode_name::<CHUNK_NAME_SIZE>(name)?;
        if !self.names.insert(name.to_string()) {
            return Err(BffError::DuplicateChunk(name.to_string()));
        }
        self.chunks.push((name.to_string(), data));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Serialize the archive into `out`, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64, BffError> {
        if self.chunks.is_empty() {
            return Err(BffError::EmptyArchive);
        }

        let mut header = BffHeader::new(self.chunks.len() as i64, self.compression);
        if let Some(version) = self.version {
            header.version = version;
        }
        out.write_all(bytemuck::bytes_of(&header))?;
        let mut written = std::mem::size_of::<BffHeader>() as u64;

        for (name, data) in &self.chunks {
            let record = ChunkRecord {
                name: encode_name(name)?,
                size: data.len() as i64,
            };
            out.write_all(bytemuck::bytes_of(&record))?;
            out.write_all(data)?;
            written += (std::mem::size_of::<ChunkRecord>() + data.len()) as u64;
        }

        out.flush()?;
        Ok(written)
    }

    pub fn finish(&self) -> Result<Vec<u8>, BffError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}
