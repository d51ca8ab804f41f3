//! Byte-level codecs shared by the database layer
//!
//! CRC-32 checksums, the widen/narrow transforms between Latin-1 and the
//! UTF-16-LE-padded form stored in DAT records, and the Latin-1 ↔ UTF-8
//! conversion used at the filesystem surface.

pub mod charset;
pub mod crc;
pub mod wide;
