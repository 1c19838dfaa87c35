//! Fixed-width, NUL-terminated name fields shared by the BFF and NGD layouts.

use crate::error::LayoutError;

/// Encode `name` into an `N`-byte field, zero padded.
///
/// At least one byte is always left for the terminator, so the longest
/// accepted name is `N - 1` bytes. Names may not contain NUL, since the
/// first NUL ends the name on decode.
pub fn encode_name<const N: usize>(name: &str) -> Result<[u8; N], LayoutError> {
    let bytes = name.as_bytes();
    if let Some(position) = bytes.iter().position(|&b| b == 0) {
        return Err(LayoutError::InteriorNul {
            name: name.to_string(),
            position,
        });
    }
    if bytes.len() >= N {
        return Err(LayoutError::NameTooLong {
            name: name.to_string(),
            len: bytes.len(),
            max: N - 1,
        });
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Decode a fixed-width name field up to its first NUL byte.
pub fn decode_name(field: &[u8]) -> Result<&str, LayoutError> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(LayoutError::NameNotTerminated)?;
    std::str::from_utf8(&field[..end]).map_err(|_| LayoutError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let field: [u8; 16] = encode_name("health").expect("fits");
        assert_eq!(&field[..6], b"health");
        assert!(field[6..].iter().all(|&b| b == 0));
        assert_eq!(decode_name(&field).expect("decode"), "health");
    }

    #[test]
    fn test_longest_name_keeps_terminator() {
        let name = "a".repeat(7);
        let field: [u8; 8] = encode_name(&name).expect("7 bytes fit in 8");
        assert_eq!(field[7], 0);

        let too_long = "a".repeat(8);
        let err = encode_name::<8>(&too_long).expect_err("no room for NUL");
        assert!(matches!(err, LayoutError::NameTooLong { len: 8, max: 7, .. }));
    }

    #[test]
    fn test_interior_nul_rejected() {
        let err = encode_name::<16>("Pla\0yer").expect_err("NUL inside name");
        assert!(matches!(err, LayoutError::InteriorNul { position: 3, .. }));
        assert!(matches!(
            encode_name::<16>("\0"),
            Err(LayoutError::InteriorNul { position: 0, .. })
        ));
    }

    #[test]
    fn test_missing_terminator_rejected() {
        assert_eq!(decode_name(b"abcd"), Err(LayoutError::NameNotTerminated));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert_eq!(decode_name(&[0xFF, 0xFE, 0]), Err(LayoutError::InvalidUtf8));
    }
}
