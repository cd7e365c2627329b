//! Canonical signing encoding.
//!
//! Every signed entity is encoded as a version byte, a domain tag, and its
//! fields in declaration order. Variable-length fields carry a 4-byte
//! little-endian length prefix; optional fields carry a presence byte. The
//! signature bytes themselves are never part of the encoding.

/// Version of the signing data format.
/// Increment this when any signing data structure changes.
pub(crate) const SIGNING_DATA_VERSION: u8 = 0x01;

/// Write a length-prefixed byte slice to the output buffer.
///
/// Format: 4-byte little-endian length followed by the data.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    // Entity fields are short strings and UUIDs; u32 is ample.
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// Start a signing buffer for the given entity kind.
pub(crate) fn signing_header(domain: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(256);
    data.push(SIGNING_DATA_VERSION);
    write_length_prefixed(&mut data, domain.as_bytes());
    data
}

/// Write an optional field: presence byte, then the value if present.
pub(crate) fn write_optional(data: &mut Vec<u8>, bytes: Option<&[u8]>) {
    match bytes {
        Some(bytes) => {
            data.push(0x01);
            write_length_prefixed(data, bytes);
        },
        None => data.push(0x00),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix() {
        let mut data = Vec::new();
        write_length_prefixed(&mut data, b"abc");
        assert_eq!(data, vec![3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let mut a = Vec::new();
        write_length_prefixed(&mut a, b"ab");
        write_length_prefixed(&mut a, b"c");

        let mut b = Vec::new();
        write_length_prefixed(&mut b, b"a");
        write_length_prefixed(&mut b, b"bc");

        assert_ne!(a, b);
    }

    #[test]
    fn test_optional_absent_differs_from_empty() {
        let mut absent = Vec::new();
        write_optional(&mut absent, None);

        let mut empty = Vec::new();
        write_optional(&mut empty, Some(b""));

        assert_ne!(absent, empty);
    }
}
