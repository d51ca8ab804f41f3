//! Audio metadata extraction
//!
//! Tag extraction is polymorphic over file kind; the kinds are a closed
//! set, so a plain enum dispatches instead of a trait object. Extraction
//! is soft: a file whose tags cannot be read still produces a row with
//! the default values, because the device would rather show
//! "Unknown artist" than lose the file.

pub mod asf;
pub mod mpeg;

use std::path::Path;

use crate::codec::wide;
use crate::config::{ASF_EXT, DEFAULT_ALBUM, DEFAULT_ARTIST, DEFAULT_GENRE, DEFAULT_TITLE, MPEG_EXT};
use crate::db::row::Row;

/// File kinds with a metadata extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Mpeg,
    Asf,
}

impl TagKind {
    /// Map a Latin-1 extension (without dot) to its extractor.
    pub fn from_extension(ext: &[u8]) -> Option<Self> {
        if ext.eq_ignore_ascii_case(MPEG_EXT.as_bytes()) {
            Some(TagKind::Mpeg)
        } else if ext.eq_ignore_ascii_case(ASF_EXT.as_bytes()) {
            Some(TagKind::Asf)
        } else {
            None
        }
    }

    /// Fill the audio fields of `row` from the file at `path`.
    ///
    /// Never fails; anything unreadable falls back to defaults.
    pub fn fill_row(self, path: &Path, row: &mut Row) {
        match self {
            TagKind::Mpeg => mpeg::fill_row(path, row),
            TagKind::Asf => asf::fill_row(path, row),
        }
    }
}

/// Write the default tag strings into a row.
pub fn apply_default_tags(row: &mut Row) {
    wide::set_field(&mut row.artist, DEFAULT_ARTIST.as_bytes());
    wide::set_field(&mut row.album, DEFAULT_ALBUM.as_bytes());
    wide::set_field(&mut row.genre, DEFAULT_GENRE.as_bytes());
    wide::set_field(&mut row.title, DEFAULT_TITLE.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::wide::field_str;

    #[test]
    fn extension_dispatch() {
        assert_eq!(TagKind::from_extension(b"mp3"), Some(TagKind::Mpeg));
        assert_eq!(TagKind::from_extension(b"MP3"), Some(TagKind::Mpeg));
        assert_eq!(TagKind::from_extension(b"wma"), Some(TagKind::Asf));
        assert_eq!(TagKind::from_extension(b"Wma"), Some(TagKind::Asf));
        assert_eq!(TagKind::from_extension(b"ogg"), None);
        assert_eq!(TagKind::from_extension(b""), None);
    }

    #[test]
    fn defaults() {
        let mut row = Row::default();
        apply_default_tags(&mut row);
        assert_eq!(field_str(&row.artist), b"Unknown artist");
        assert_eq!(field_str(&row.album), b"Unknown album");
        assert_eq!(field_str(&row.genre), b"Unknown");
        assert_eq!(field_str(&row.title), b"Unknown title");
    }
}
