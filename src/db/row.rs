//! The fixed-size database record
//!
//! One record per visible audio file, written verbatim to the DAT file.
//! The device firmware reads this layout directly, so field order, widths
//! and endianness are exact. All fields are little-endian; string fields
//! are UTF-16-LE-padded Latin-1 (see [`crate::codec::wide`]).
//!
//! Record layout:
//!   0x000 hidden      u32    1 if the long name starts with '.'
//!   0x004 reserved    8      zeroed, indexed under column code @DEV
//!   0x00C filepath    56     backslash-terminated relative path
//!   0x044 filename    32     short name
//!   0x064 bitrate     u32    bit/s
//!   0x068 samplerate  u32    Hz
//!   0x06C duration    u32    seconds
//!   0x070 artist      80
//!   0x0C0 album       80
//!   0x110 genre       40
//!   0x138 title       80
//!   0x188 track       u32
//!   0x18C year        u32
//!   0x190 filesize    u32    bytes
//!   0x194 source      u32    see [`Source`]

use binrw::{BinRead, BinWrite};

use crate::codec::wide;

pub const FILEPATH_WIDTH: usize = 56;
pub const FILENAME_WIDTH: usize = 32;
pub const ARTIST_WIDTH: usize = 80;
pub const ALBUM_WIDTH: usize = 80;
pub const GENRE_WIDTH: usize = 40;
pub const TITLE_WIDTH: usize = 80;

/// Total record size in bytes: the sum of every field width.
pub const RECORD_SIZE: u64 = (4
    + 8
    + FILEPATH_WIDTH
    + FILENAME_WIDTH
    + 4
    + 4
    + 4
    + ARTIST_WIDTH
    + ALBUM_WIDTH
    + GENRE_WIDTH
    + TITLE_WIDTH
    + 4
    + 4
    + 4
    + 4) as u64;

/// Where a record came from. Everything created through the filesystem
/// surface is [`Source::File`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    File = 0,
    Optical = 1,
    Analog = 2,
    Micro = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Row {
    pub hidden: u32,
    pub reserved: [u8; 8],
    pub filepath: [u8; FILEPATH_WIDTH],
    pub filename: [u8; FILENAME_WIDTH],
    pub bitrate: u32,
    pub samplerate: u32,
    pub duration: u32,
    pub artist: [u8; ARTIST_WIDTH],
    pub album: [u8; ALBUM_WIDTH],
    pub genre: [u8; GENRE_WIDTH],
    pub title: [u8; TITLE_WIDTH],
    pub track: u32,
    pub year: u32,
    pub filesize: u32,
    pub source: u32,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            hidden: 0,
            reserved: [0; 8],
            filepath: [0; FILEPATH_WIDTH],
            filename: [0; FILENAME_WIDTH],
            bitrate: 0,
            samplerate: 0,
            duration: 0,
            artist: [0; ARTIST_WIDTH],
            album: [0; ALBUM_WIDTH],
            genre: [0; GENRE_WIDTH],
            title: [0; TITLE_WIDTH],
            track: 0,
            year: 0,
            filesize: 0,
            source: Source::File as u32,
        }
    }
}

impl Row {
    /// Convert all six string fields from Latin-1 to the padded disk
    /// form. Apply exactly once, right before DAT I/O.
    pub fn widen_strings(&mut self) {
        wide::widen(&mut self.filepath);
        wide::widen(&mut self.filename);
        wide::widen(&mut self.artist);
        wide::widen(&mut self.album);
        wide::widen(&mut self.genre);
        wide::widen(&mut self.title);
    }

    /// Convert all six string fields from the padded disk form back to
    /// Latin-1.
    pub fn narrow_strings(&mut self) {
        wide::narrow(&mut self.filepath);
        wide::narrow(&mut self.filename);
        wide::narrow(&mut self.artist);
        wide::narrow(&mut self.album);
        wide::narrow(&mut self.genre);
        wide::narrow(&mut self.title);
    }

    /// Dump the row to the log at trace level. Fields must be narrow.
    pub fn trace_dump(&self) {
        use crate::codec::charset::latin1_to_utf8;
        use crate::codec::wide::field_str;

        log::trace!("dir: '{}'", latin1_to_utf8(field_str(&self.filepath)));
        log::trace!("file: '{}'", latin1_to_utf8(field_str(&self.filename)));
        log::trace!("bitrate: {} bit/s", self.bitrate);
        log::trace!("samplerate: {} Hz", self.samplerate);
        log::trace!("duration: {} s", self.duration);
        log::trace!("artist: '{}'", latin1_to_utf8(field_str(&self.artist)));
        log::trace!("album: '{}'", latin1_to_utf8(field_str(&self.album)));
        log::trace!("genre: '{}'", latin1_to_utf8(field_str(&self.genre)));
        log::trace!("title: '{}'", latin1_to_utf8(field_str(&self.title)));
        log::trace!("track: {}", self.track);
        log::trace!("year: {}", self.year);
        log::trace!("filesize: {}", self.filesize);
        log::trace!("source: {}", self.source);
    }
}
