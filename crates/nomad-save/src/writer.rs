use std::collections::HashSet;
use std::io::{Seek, SeekFrom, Write};

use glam::{Vec2, Vec3, Vec4};
use nomad_core::encode_name;

use crate::error::SaveError;
use crate::field::{ArrayElement, ArrayValue, FieldScalar, FieldValue};
use crate::format::{
    FieldHeader, NgdHeader, SectionHeader, Version, ENGINE_VERSION, FIELD_HEADER_SIZE, NAME_SIZE,
    NGD_IDENT, SECTION_COUNT_OFFSET,
};
use crate::metadata::GameMetadata;
use crate::sink::{FlushedSection, SectionSink};

/// Maximum nesting depth of open sections.
pub const MAX_SECTION_DEPTH: usize = 64;

#[derive(Debug)]
struct SectionFrame {
    name: String,
    field_count: i32,
    stream_offset: u64,
    child_bytes: u64,
    block: Vec<u8>,
    field_names: HashSet<String>,
}

/// Bounded stack of open sections. Overflow is an error, never a write past
/// the end.
#[derive(Debug, Default)]
struct SectionStack {
    frames: Vec<SectionFrame>,
}

impl SectionStack {
    fn push(&mut self, frame: SectionFrame) -> Result<(), SaveError> {
        if self.frames.len() >= MAX_SECTION_DEPTH {
            return Err(SaveError::StackOverflow {
                max: MAX_SECTION_DEPTH,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    fn pop(&mut self) -> Option<SectionFrame> {
        self.frames.pop()
    }

    fn top_mut(&mut self) -> Option<&mut SectionFrame> {
        self.frames.last_mut()
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Closed,
    Failed,
}

/// Streams an NGD save: header and metadata up front, then one section
/// record each time a section closes.
///
/// Fields are appended to whichever section is on top of the stack. A
/// section's bytes go to the stream once, when it ends, and are never
/// revisited; only the section count in the header is patched on finalize.
/// After any error the writer refuses further work and never finalizes.
pub struct SectionWriter<W: Write + Seek> {
    out: W,
    stack: SectionStack,
    state: WriterState,
    sections_written: u64,
    sinks: Vec<Box<dyn SectionSink>>,
}

impl<W: Write + Seek> SectionWriter<W> {
    pub fn create(out: W, metadata: &GameMetadata) -> Result<Self, SaveError> {
        Self::create_with_version(out, metadata, ENGINE_VERSION)
    }

    /// Write the placeholder header and the metadata block.
    pub fn create_with_version(
        mut out: W,
        metadata: &GameMetadata,
        version: Version,
    ) -> Result<Self, SaveError> {
        let header = NgdHeader {
            ident: NGD_IDENT,
            version: version.to_bits(),
            section_count: 0,
        };
        out.write_all(bytemuck::bytes_of(&header))?;
        out.write_all(&metadata.encode()?)?;

        Ok(Self {
            out,
            stack: SectionStack::default(),
            state: WriterState::Open,
            sections_written: 0,
            sinks: Vec::new(),
        })
    }

    /// Attach an observer called with every section as it is flushed.
    pub fn attach_sink(&mut self, sink: Box<dyn SectionSink>) {
        self.sinks.push(sink);
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn sections_written(&self) -> u64 {
        self.sections_written
    }

    pub fn is_finalized(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_open(&self) -> Result<(), SaveError> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Closed => Err(SaveError::WriterClosed),
            WriterState::Failed => Err(SaveError::WriterFailed),
        }
    }

    fn poison_on_err<T>(&mut self, result: Result<T, SaveError>) -> Result<T, SaveError> {
        if let Err(err) = &result {
            log::warn!("save aborted: {err}");
            self.state = WriterState::Failed;
        }
        result
    }

    pub fn begin_section(&mut self, name: &str) -> Result<(), SaveError> {
        self.ensure_open()?;
        let result = self.push_section(name);
        self.poison_on_err(result)
    }

    fn push_section(&mut self, name: &str) -> Result<(), SaveError> {
        encode_name::<NAME_SIZE>(name)?;
        let stream_offset = self.out.stream_position()?;
        self.stack.push(SectionFrame {
            name: name.to_string(),
            field_count: 0,
            stream_offset,
            child_bytes: 0,
            block: Vec::new(),
            field_names: HashSet::new(),
        })
    }

    pub fn end_section(&mut self) -> Result<(), SaveError> {
        self.ensure_open()?;
        let result = self.flush_section();
        self.poison_on_err(result)
    }

    fn flush_section(&mut self) -> Result<(), SaveError> {
        let depth = self.stack.depth();
        let frame = self.stack.pop().ok_or(SaveError::StackUnderflow)?;

        let byte_size = u32::try_from(frame.block.len()).map_err(|_| SaveError::FieldTooLarge {
            field: frame.name.clone(),
            size: frame.block.len(),
        })?;
        let header = SectionHeader {
            name: encode_name(&frame.name)?,
            name_length: frame.name.len() as i32,
            field_count: frame.field_count,
            byte_size,
        };

        let mut record = Vec::with_capacity(std::mem::size_of::<SectionHeader>() + frame.block.len());
        record.extend_from_slice(bytemuck::bytes_of(&header));
        record.extend_from_slice(&frame.block);
        self.out.write_all(&record)?;

        let flushed = FlushedSection {
            name: &frame.name,
            depth,
            sequence: self.sections_written,
            bytes: &record,
        };
        for sink in &mut self.sinks {
            sink.section_flushed(&flushed)?;
        }

        if let Some(parent) = self.stack.top_mut() {
            parent.child_bytes += record.len() as u64;
        }
        self.sections_written += 1;

        log::debug!(
            "flushed section '{}' at offset {} ({} fields, {} bytes, {} bytes of children)",
            frame.name,
            frame.stream_offset,
            frame.field_count,
            record.len(),
            frame.child_bytes
        );
        Ok(())
    }

    /// Append a field to the section on top of the stack.
    pub fn save_value(&mut self, name: &str, value: FieldValue) -> Result<(), SaveError> {
        self.ensure_open()?;
        let result = self.append_field(name, &value);
        self.poison_on_err(result)
    }

    fn append_field(&mut self, name: &str, value: &FieldValue) -> Result<(), SaveError> {
        let frame = self.stack.top_mut().ok_or(SaveError::NoActiveSection)?;
        let encoded_name = encode_name::<NAME_SIZE>(name)?;

        let mut payload = Vec::new();
        value.encode(&mut payload);
        let data_size = i32::try_from(payload.len()).map_err(|_| SaveError::FieldTooLarge {
            field: name.to_string(),
            size: payload.len(),
        })?;
        let data_offset = i32::try_from(frame.block.len() + FIELD_HEADER_SIZE).map_err(|_| {
            SaveError::FieldTooLarge {
                field: name.to_string(),
                size: payload.len(),
            }
        })?;

        if !frame.field_names.insert(name.to_string()) {
            log::warn!(
                "field '{name}' saved twice in section '{}'; loads will see the first value",
                frame.name
            );
        }

        let header = FieldHeader {
            name: encoded_name,
            name_length: name.len() as i32,
            type_tag: value.field_type().tag(),
            data_size,
            data_offset,
        };
        frame.block.extend_from_slice(bytemuck::bytes_of(&header));
        frame.block.extend_from_slice(&payload);
        frame.field_count += 1;
        Ok(())
    }

    pub fn save<T: FieldScalar>(&mut self, name: &str, value: T) -> Result<(), SaveError> {
        self.save_value(name, value.into_value())
    }

    pub fn save_byte(&mut self, name: &str, value: u8) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_ushort(&mut self, name: &str, value: u16) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_uint(&mut self, name: &str, value: u32) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_ulong(&mut self, name: &str, value: u64) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_char(&mut self, name: &str, value: i8) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_short(&mut self, name: &str, value: i16) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_int(&mut self, name: &str, value: i32) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_long(&mut self, name: &str, value: i64) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_float(&mut self, name: &str, value: f32) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_vec2(&mut self, name: &str, value: Vec2) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_vec3(&mut self, name: &str, value: Vec3) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_vec4(&mut self, name: &str, value: Vec4) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_cstring(&mut self, name: &str, value: &str) -> Result<(), SaveError> {
        self.save_value(name, FieldValue::String(value.to_string()))
    }

    pub fn save_string(&mut self, name: &str, value: String) -> Result<(), SaveError> {
        self.save(name, value)
    }

    pub fn save_array<T: ArrayElement>(&mut self, name: &str, items: &[T]) -> Result<(), SaveError> {
        self.save_value(name, FieldValue::Array(ArrayValue::from_slice(items)))
    }

    /// Patch the section count into the header and flush the stream.
    ///
    /// Fails, and leaves the save unfinished, if any section is still open.
    pub fn finalize(&mut self) -> Result<(), SaveError> {
        self.ensure_open()?;
        let result = self.write_trailer();
        let result = self.poison_on_err(result);
        if result.is_ok() {
            self.state = WriterState::Closed;
        }
        result
    }

    fn write_trailer(&mut self) -> Result<(), SaveError> {
        let open = self.stack.depth();
        if open > 0 {
            return Err(SaveError::UnbalancedSections { open });
        }
        let section_count = self.sections_written as i64;
        self.out.seek(SeekFrom::Start(SECTION_COUNT_OFFSET))?;
        self.out.write_all(&section_count.to_le_bytes())?;
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;
        log::debug!("finalized save with {section_count} sections");
        Ok(())
    }
}
