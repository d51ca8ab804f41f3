//! Latin-1 ↔ UTF-8 conversion
//!
//! The database stores Latin-1; the filesystem surface speaks UTF-8.
//! Conversion is one byte at a time: bytes below 0x80 are identical, and
//! bytes 0x80..=0xFF map to the two-byte UTF-8 sequence for the scalar
//! value of the same number. There is no multi-codepoint handling;
//! scalars above U+00FF simply have no Latin-1 form and are dropped.

/// Decode Latin-1 bytes into a UTF-8 string, stopping at the first NUL.
pub fn latin1_to_utf8(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Encode a UTF-8 string as Latin-1 bytes, dropping characters the
/// charset cannot represent.
pub fn utf8_to_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| {
            let v = c as u32;
            (v <= 0xFF).then_some(v as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_identity() {
        assert_eq!(latin1_to_utf8(b"Track 01.mp3"), "Track 01.mp3");
        assert_eq!(utf8_to_latin1("Track 01.mp3"), b"Track 01.mp3");
    }

    #[test]
    fn high_bytes_round_trip() {
        let latin1 = [0xE9, 0xE8, 0xAE, 0x80, 0xFF, 0xE6];
        let utf8 = latin1_to_utf8(&latin1);
        assert_eq!(utf8, "éè®\u{80}ÿæ");
        assert_eq!(utf8_to_latin1(&utf8), latin1);
    }

    #[test]
    fn stops_at_nul() {
        assert_eq!(latin1_to_utf8(b"abc\0def"), "abc");
    }

    #[test]
    fn unrepresentable_characters_are_dropped() {
        assert_eq!(utf8_to_latin1("a\u{4e2d}b"), b"ab");
    }
}
