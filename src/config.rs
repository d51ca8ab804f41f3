//! Build-time configuration constants
//!
//! Paths are relative to the device root and ASCII; the device firmware
//! resolves them itself, so none of these are configurable at runtime.

/// Music directory on the device, holding the audio files under their
/// short names.
pub const MUSIC_PATH: &str = "MUSIC";

/// Directory holding the database files.
pub const DATA_DIR: &str = "System/DATA";

/// Fixed-record data file.
pub const DAT_FILE: &str = "DB5000.DAT";

/// Device header file; the row count lives at [`HDR_COUNT_OFFSET`].
pub const HDR_FILE: &str = "DB5000.HDR";

/// Long-name translation table, CRLF text at the device root.
pub const NAMES_FILE: &str = "Names.txt";

/// Log file written at the device root.
pub const LOG_FILENAME: &str = "db5fuse.log";

/// Absolute offset of the little-endian u32 row count in the header file.
pub const HDR_COUNT_OFFSET: u64 = 1040;

/// Maximum number of database rows.
pub const MAX_ENTRIES: u32 = 4_294_967_293;

/// Extension handled by the ASF extractor.
pub const ASF_EXT: &str = "wma";

/// Extension handled by the MPEG extractor.
pub const MPEG_EXT: &str = "mp3";

/// Fallback tag values for files whose tags are missing or unreadable.
pub const DEFAULT_ARTIST: &str = "Unknown artist";
pub const DEFAULT_ALBUM: &str = "Unknown album";
pub const DEFAULT_GENRE: &str = "Unknown";
pub const DEFAULT_TITLE: &str = "Unknown title";
