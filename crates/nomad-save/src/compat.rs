use std::io::{self, Read};

use nomad_core::ByteReader;

use crate::error::SaveError;
use crate::format::{
    NgdHeader, Version, HEADER_SIZE, METADATA_SIZE, MIN_READABLE_MAJOR, MOD_RECORD_SIZE, NGD_IDENT,
};
use crate::metadata::GameMetadata;

/// Everything in front of the first section.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub version: Version,
    pub section_count: usize,
    pub metadata: GameMetadata,
    /// Compatibility warnings (version mismatch).
    pub warnings: Vec<String>,
    /// Bytes consumed: fixed header, metadata and mod records.
    pub header_len: usize,
}

/// Validate the ident and version of a save header.
///
/// Returns Ok(warnings) on success. Only saves older than the minimum
/// readable major version are rejected; any other difference from
/// `expected` is a warning.
pub fn validate_header(header: &NgdHeader, expected: Version) -> Result<Vec<String>, SaveError> {
    let ident = header.ident;
    if ident != NGD_IDENT {
        return Err(SaveError::BadIdent(ident));
    }

    let found = Version::from_bits(header.version);
    if found.major < MIN_READABLE_MAJOR {
        return Err(SaveError::VersionTooOld {
            found,
            minimum: MIN_READABLE_MAJOR,
        });
    }

    let section_count = header.section_count;
    if section_count < 0 {
        return Err(SaveError::CorruptHeader(format!(
            "negative section count {section_count}"
        )));
    }

    let mut warnings = Vec::new();
    if found != expected {
        warnings.push(format!(
            "Save was written by version {found}, this build expects {expected}. \
             Loading anyway; some values may be missing or reinterpreted."
        ));
    }
    Ok(warnings)
}

/// Read exactly `buf.len()` bytes, reporting short reads as `Truncated`.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8], offset: usize) -> Result<(), SaveError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(SaveError::Truncated {
                    offset,
                    wanted: buf.len(),
                    available: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(SaveError::Stream(e)),
        }
    }
    Ok(())
}

/// Read and validate the header and game metadata from a stream.
///
/// Pulls exactly `header_len` bytes from `reader` and nothing more, so the
/// slot picker never pays for section data.
pub fn read_header<R: Read>(reader: &mut R, expected: Version) -> Result<HeaderInfo, SaveError> {
    let mut fixed = [0u8; HEADER_SIZE + METADATA_SIZE];
    fill(reader, &mut fixed, 0)?;

    let mut cursor = ByteReader::new(&fixed);
    let header: NgdHeader = cursor.read_pod()?;
    let warnings = validate_header(&header, expected)?;

    let (mut metadata, mod_count) = GameMetadata::decode_fixed(cursor.read_bytes(METADATA_SIZE)?)?;
    let mut mods = vec![0u8; mod_count * MOD_RECORD_SIZE];
    fill(reader, &mut mods, fixed.len())?;
    metadata.decode_mods(&mods)?;

    Ok(HeaderInfo {
        version: Version::from_bits(header.version),
        section_count: header.section_count as usize,
        metadata,
        warnings,
        header_len: fixed.len() + mods.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ENGINE_VERSION;

    fn test_header(version: Version) -> NgdHeader {
        NgdHeader {
            ident: NGD_IDENT,
            version: version.to_bits(),
            section_count: 0,
        }
    }

    fn encoded(version: Version, metadata: &GameMetadata) -> Vec<u8> {
        let mut bytes = bytemuck::bytes_of(&test_header(version)).to_vec();
        bytes.extend(metadata.encode().expect("metadata"));
        bytes
    }

    #[test]
    fn test_valid_header_no_warnings() {
        let warnings =
            validate_header(&test_header(ENGINE_VERSION), ENGINE_VERSION).expect("should succeed");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_newer_version_warns() {
        let header = test_header(Version::new(1, 3, 0));
        let warnings = validate_header(&header, ENGINE_VERSION).expect("should load with warning");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("1.3.0"));
    }

    #[test]
    fn test_old_major_rejected() {
        let header = test_header(Version::new(0, 9, 9));
        assert!(matches!(
            validate_header(&header, ENGINE_VERSION),
            Err(SaveError::VersionTooOld { minimum: 1, .. })
        ));
    }

    #[test]
    fn test_bad_ident_rejected() {
        let mut header = test_header(ENGINE_VERSION);
        header.ident = 0xDEAD_BEEF;
        assert!(matches!(
            validate_header(&header, ENGINE_VERSION),
            Err(SaveError::BadIdent(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn test_negative_section_count_rejected() {
        let mut header = test_header(ENGINE_VERSION);
        header.section_count = -1;
        assert!(matches!(
            validate_header(&header, ENGINE_VERSION),
            Err(SaveError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_read_header_consumes_exact_prefix() {
        let metadata = GameMetadata {
            map_index: 4,
            mods: vec![Default::default(), Default::default()],
            ..Default::default()
        };
        let mut bytes = encoded(ENGINE_VERSION, &metadata);
        bytes.extend_from_slice(&[0xEE; 32]);

        let mut stream = &bytes[..];
        let info = read_header(&mut stream, ENGINE_VERSION).expect("header");
        assert_eq!(info.metadata, metadata);
        assert_eq!(info.header_len, HEADER_SIZE + metadata.encoded_len());
        assert_eq!(stream.len(), 32);
    }

    #[test]
    fn test_read_header_truncated() {
        let bytes = encoded(ENGINE_VERSION, &GameMetadata::default());
        let mut stream = &bytes[..30];
        assert!(matches!(
            read_header(&mut stream, ENGINE_VERSION),
            Err(SaveError::Truncated {
                offset: 0,
                available: 30,
                ..
            })
        ));
    }
}
