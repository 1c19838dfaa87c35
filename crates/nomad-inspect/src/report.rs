use std::fmt::Display;

use nomad_bff::{AssetClass, BffArchive, ChunkKind, CompressionMode};
use nomad_save::{
    ArrayElement, ArrayValue, FieldType, FieldValue, GameMetadata, ParsedSave, Version,
};

/// One row of the chunk table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkReport {
    pub name: String,
    pub offset: u64,
    pub size: usize,
    pub kind: Option<ChunkKind>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BffReport {
    pub version: i16,
    pub compression: CompressionMode,
    pub chunks: Vec<ChunkReport>,
    /// Catalogued chunk count per asset class.
    pub classes: Vec<(AssetClass, usize)>,
    pub warnings: Vec<String>,
}

pub fn bff_report(archive: &BffArchive) -> BffReport {
    BffReport {
        version: archive.version(),
        compression: archive.compression(),
        chunks: archive
            .chunks()
            .iter()
            .map(|chunk| ChunkReport {
                name: chunk.name().to_string(),
                offset: chunk.offset(),
                size: chunk.size(),
                kind: chunk.kind(),
            })
            .collect(),
        classes: AssetClass::ALL
            .iter()
            .map(|&class| (class, archive.catalog().len(class)))
            .collect(),
        warnings: archive.warnings().to_vec(),
    }
}

/// Format a BFF report as a markdown summary.
pub fn format_bff(report: &BffReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "BFF version {:#06x}, compression {}, {} chunks\n\n",
        report.version,
        report.compression.as_str(),
        report.chunks.len()
    ));
    out.push_str("| Chunk | Offset | Size | Class |\n");
    out.push_str("|-------|--------|------|-------|\n");
    for chunk in &report.chunks {
        let class = chunk
            .kind
            .map(|kind| kind.class().label())
            .unwrap_or("unclassified");
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            chunk.name, chunk.offset, chunk.size, class
        ));
    }

    out.push('\n');
    for (class, count) in &report.classes {
        out.push_str(&format!(
            "{}: {}/{}\n",
            class.label(),
            count,
            class.capacity()
        ));
    }
    for warning in &report.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldReport {
    pub name: String,
    pub ty: FieldType,
    pub value: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SectionReport {
    pub name: String,
    pub offset: usize,
    pub byte_size: usize,
    pub fields: Vec<FieldReport>,
    /// Set when the field block could not be decoded.
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NgdReport {
    pub file: String,
    pub version: Version,
    pub metadata: GameMetadata,
    pub sections: Vec<SectionReport>,
    pub warnings: Vec<String>,
}

/// Decode every section of a save. A corrupt section is reported, not fatal.
pub fn ngd_report(save: &ParsedSave) -> NgdReport {
    let sections = save
        .sections()
        .map(|(handle, info)| {
            let (fields, error) = match save.fields(handle) {
                Ok(fields) => (
                    fields
                        .iter()
                        .map(|f| FieldReport {
                            name: f.name.clone(),
                            ty: f.value.field_type(),
                            value: render_value(&f.value),
                        })
                        .collect(),
                    None,
                ),
                Err(err) => (Vec::new(), Some(err.to_string())),
            };
            SectionReport {
                name: info.name.clone(),
                offset: info.offset,
                byte_size: info.byte_size,
                fields,
                error,
            }
        })
        .collect();

    NgdReport {
        file: save.name().to_string(),
        version: save.version(),
        metadata: save.metadata().clone(),
        sections,
        warnings: save.warnings().to_vec(),
    }
}

pub fn format_ngd(report: &NgdReport) -> String {
    let m = &report.metadata;
    let mut out = String::new();
    out.push_str(&format!(
        "{}: NGD version {}, {} sections\n",
        report.file,
        report.version,
        report.sections.len()
    ));
    out.push_str(&format!(
        "map {} | difficulty {} (highest {}) | played {}h{:02}m\n",
        m.map_index,
        m.save_difficulty,
        m.highest_difficulty,
        m.play_time_hours,
        m.play_time_minutes
    ));
    for module in &m.mods {
        out.push_str(&format!(
            "mod {} {}.{}.{}\n",
            module.name, module.version_major, module.version_update, module.version_patch
        ));
    }

    for section in &report.sections {
        out.push_str(&format!(
            "\n[{}] offset {} ({} bytes)\n",
            section.name, section.offset, section.byte_size
        ));
        if let Some(err) = &section.error {
            out.push_str(&format!("  corrupt: {err}\n"));
        }
        for field in &section.fields {
            out.push_str(&format!("  {}: {} = {}\n", field.name, field.ty, field.value));
        }
    }
    for warning in &report.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::I8(v) => v.to_string(),
        FieldValue::I16(v) => v.to_string(),
        FieldValue::I32(v) => v.to_string(),
        FieldValue::I64(v) => v.to_string(),
        FieldValue::U8(v) => v.to_string(),
        FieldValue::U16(v) => v.to_string(),
        FieldValue::U32(v) => v.to_string(),
        FieldValue::U64(v) => v.to_string(),
        FieldValue::F32(v) => v.to_string(),
        FieldValue::String(s) => format!("{s:?}"),
        FieldValue::Vec2(v) => format!("({}, {})", v.x, v.y),
        FieldValue::Vec3(v) => format!("({}, {}, {})", v.x, v.y, v.z),
        FieldValue::Vec4(v) => format!("({}, {}, {}, {})", v.x, v.y, v.z, v.w),
        FieldValue::Array(a) => render_array(a),
    }
}

fn join<T: ArrayElement + Display>(array: &ArrayValue) -> String {
    array
        .to_vec::<T>()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_array(array: &ArrayValue) -> String {
    let items = match array.element_type() {
        FieldType::I8 => join::<i8>(array),
        FieldType::I16 => join::<i16>(array),
        FieldType::I32 => join::<i32>(array),
        FieldType::I64 => join::<i64>(array),
        FieldType::U8 => join::<u8>(array),
        FieldType::U16 => join::<u16>(array),
        FieldType::U32 => join::<u32>(array),
        FieldType::U64 => join::<u64>(array),
        FieldType::F32 => join::<f32>(array),
        _ => String::new(),
    };
    format!("{}[{}] [{}]", array.element_type(), array.len(), items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use nomad_bff::BffWriter;
    use nomad_save::{SectionWriter, ENGINE_VERSION};
    use std::io::Cursor;

    #[test]
    fn test_bff_report_lists_chunks() {
        let mut writer = BffWriter::new(CompressionMode::None);
        writer.add_chunk("level1.tmj", b"{}".to_vec()).expect("level");
        writer.add_chunk("gun.png", vec![0; 16]).expect("texture");
        writer.add_chunk("readme", vec![1]).expect("other");
        let archive = BffArchive::from_bytes(&writer.finish().expect("finish")).expect("open");

        let report = bff_report(&archive);
        assert_eq!(report.chunks.len(), 3);
        assert_eq!(report.chunks[1].size, 16);

        let text = format_bff(&report);
        assert!(text.contains("| level1.tmj |"));
        assert!(text.contains("| gun.png |"));
        assert!(text.contains("unclassified"));
        assert!(text.contains("texture: 1/128"));
        assert!(text.contains("script: 0/64"));
    }

    #[test]
    fn test_ngd_report_renders_fields() {
        let mut writer =
            SectionWriter::create(Cursor::new(Vec::new()), &GameMetadata::default())
                .expect("create");
        writer.begin_section("Player").expect("begin");
        writer.save_int("health", 100).expect("health");
        writer
            .save_vec3("pos", Vec3::new(1.0, 2.0, 3.0))
            .expect("pos");
        writer.save_array("ammo", &[6u8, 30]).expect("ammo");
        writer.end_section().expect("end");
        writer.finalize().expect("finalize");

        let bytes = writer.into_inner().into_inner();
        let save = ParsedSave::parse("slot0.ngd", bytes, ENGINE_VERSION).expect("parse");
        let report = ngd_report(&save);
        assert_eq!(report.sections.len(), 1);
        assert!(report.sections[0].error.is_none());

        let text = format_ngd(&report);
        assert!(text.contains("[Player]"));
        assert!(text.contains("health: i32 = 100"));
        assert!(text.contains("pos: vec3 = (1, 2, 3)"));
        assert!(text.contains("ammo: array = u8[2] [6, 30]"));

        let json = serde_json::to_string(&report).expect("json");
        assert!(json.contains("\"health\""));
    }
}
