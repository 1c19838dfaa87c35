use crate::error::BffError;
use crate::format::{BffHeader, CompressionMode, BFF_IDENT, BFF_VERSION, HEADER_MAGIC};

/// Validate a BFF header and return any compatibility warnings.
///
/// Ident, magic, chunk count and compression mode are hard checks. A
/// version mismatch or a reserved compression mode only produces a warning.
pub fn validate_header(header: &BffHeader) -> Result<Vec<String>, BffError> {
    let BffHeader {
        ident,
        magic,
        chunk_count,
        compression,
        version,
    } = *header;

    if ident != BFF_IDENT {
        return Err(BffError::BadIdent(ident));
    }
    if magic != HEADER_MAGIC {
        return Err(BffError::BadMagic(magic));
    }
    if chunk_count <= 0 {
        return Err(BffError::BadChunkCount(chunk_count));
    }
    let mode =
        CompressionMode::from_raw(compression).ok_or(BffError::UnknownCompression(compression))?;

    let mut warnings = Vec::new();

    if version != BFF_VERSION {
        warnings.push(format!(
            "Archive version {version:#06x} differs from supported version {BFF_VERSION:#06x}; \
             loading anyway."
        ));
    }

    if mode != CompressionMode::None {
        warnings.push(format!(
            "Archive declares {} compression; payloads are kept as stored.",
            mode.as_str()
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_no_warnings() {
        let header = BffHeader::new(3, CompressionMode::None);
        let warnings = validate_header(&header).expect("should succeed");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_version_mismatch_warns() {
        let mut header = BffHeader::new(1, CompressionMode::None);
        header.version = 0x0203;
        let warnings = validate_header(&header).expect("should succeed with warnings");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("differs from supported version"));
    }

    #[test]
    fn test_reserved_compression_warns() {
        let header = BffHeader::new(1, CompressionMode::Bzip2);
        let warnings = validate_header(&header).expect("should succeed with warnings");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("bzip2"));
    }

    #[test]
    fn test_bad_ident_rejected() {
        let mut header = BffHeader::new(1, CompressionMode::None);
        header.ident = 0;
        assert!(matches!(validate_header(&header), Err(BffError::BadIdent(0))));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut header = BffHeader::new(1, CompressionMode::None);
        header.magic = 1;
        assert!(matches!(validate_header(&header), Err(BffError::BadMagic(1))));
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let header = BffHeader::new(0, CompressionMode::None);
        assert!(matches!(
            validate_header(&header),
            Err(BffError::BadChunkCount(0))
        ));
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let mut header = BffHeader::new(1, CompressionMode::None);
        header.compression = 9;
        assert!(matches!(
            validate_header(&header),
            Err(BffError::UnknownCompression(9))
        ));
    }
}
