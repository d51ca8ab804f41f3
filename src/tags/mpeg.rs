//! MPEG audio extraction
//!
//! Audio properties come from the first frame header found in the
//! leading 10 KiB of the file; tags come from ID3 via the `id3` crate.
//! Frame header reference: http://www.mpgedit.org/mpgedit/mpeg_format/mpeghdr.htm

use std::fs::File;
use std::io::Read;
use std::path::Path;

use id3::TagLike;

use crate::codec::charset::utf8_to_latin1;
use crate::codec::wide;
use crate::config::{DEFAULT_ALBUM, DEFAULT_ARTIST, DEFAULT_GENRE, DEFAULT_TITLE};
use crate::db::row::Row;
use crate::paths;

/// How much of the file is scanned for the first frame.
const SCAN_BUFFER_SIZE: usize = 10 * 1024;

/// Bitrate in kbit/s by index, MPEG version (1, 2/2.5) and layer.
const BITRATE_INDEX: [[[u32; 3]; 2]; 16] = [
    [[0, 0, 0], [0, 0, 0]],
    [[32, 32, 32], [32, 8, 8]],
    [[64, 48, 40], [48, 16, 16]],
    [[96, 56, 48], [56, 24, 24]],
    [[128, 64, 56], [64, 32, 32]],
    [[160, 80, 64], [80, 40, 40]],
    [[192, 96, 80], [96, 48, 48]],
    [[224, 112, 96], [112, 56, 56]],
    [[256, 128, 112], [128, 64, 64]],
    [[288, 160, 128], [144, 80, 80]],
    [[320, 192, 160], [160, 96, 96]],
    [[352, 224, 192], [176, 112, 112]],
    [[384, 256, 224], [192, 128, 128]],
    [[416, 320, 256], [224, 144, 144]],
    [[448, 384, 320], [256, 160, 160]],
    [[0, 0, 0], [0, 0, 0]],
];

/// Samplerate in Hz by index and MPEG version (1, 2, 2.5).
const SAMPLERATE_INDEX: [[u32; 3]; 4] = [
    [44100, 22050, 11025],
    [48000, 24000, 12000],
    [32000, 16000, 8000],
    [0, 0, 0],
];

/// The 4-byte frame header, interpreted as a little-endian bitfield
/// after a byte swap of the big-endian stream.
struct FrameHeader(u32);

impl FrameHeader {
    fn from_bytes(raw: &[u8; 4]) -> Self {
        let mut swapped = [0u8; 4];
        wide::swap_copy(&mut swapped, raw);
        Self(u32::from_le_bytes(swapped))
    }

    /// MPEG version: 1 or 2 (2.5 counts as 2); 0 for the reserved code.
    fn version(&self) -> u32 {
        match (self.0 >> 19) & 0x3 {
            3 => 1,
            2 | 0 => 2,
            _ => 0,
        }
    }

    /// Coding layer 1..=3; 0 for the reserved code.
    fn layer(&self) -> u32 {
        match (self.0 >> 17) & 0x3 {
            3 => 1,
            2 => 2,
            1 => 3,
            _ => 0,
        }
    }

    /// Bitrate in bit/s; 0 when any field is reserved.
    fn bitrate(&self) -> u32 {
        let version = self.version();
        let layer = self.layer();
        if version == 0 || layer == 0 {
            return 0;
        }
        let index = ((self.0 >> 12) & 0xF) as usize;
        1000 * BITRATE_INDEX[index][version as usize - 1][layer as usize - 1]
    }

    /// Samplerate in Hz; 0 when reserved.
    fn samplerate(&self) -> u32 {
        let index = ((self.0 >> 10) & 0x3) as usize;
        match (self.0 >> 19) & 0x3 {
            3 => SAMPLERATE_INDEX[index][0],
            2 => SAMPLERATE_INDEX[index][1],
            0 => SAMPLERATE_INDEX[index][2],
            _ => 0,
        }
    }
}

/// Offset of the first frame sync in `buffer`, if any.
fn next_frame(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < 4 {
        return None;
    }
    (0..buffer.len() - 4)
        .find(|&i| buffer[i] == 0xFF && buffer[i + 1] & 0xE0 == 0xE0)
}

/// Estimated duration in seconds from a constant-bitrate assumption.
fn length(bitrate: u32, filesize: u64) -> u32 {
    if bitrate < 8 {
        return 0;
    }
    (filesize / (bitrate as u64 / 8)) as u32
}

fn read_frame_info(path: &Path, row: &mut Row) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; SCAN_BUFFER_SIZE];
    let mut read = 0;
    while read < buffer.len() {
        let n = file.read(&mut buffer[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    buffer.truncate(read);

    let filesize = paths::filesize(path);
    row.filesize = filesize as u32;

    let offset = match next_frame(&buffer) {
        Some(offset) => offset,
        None => return Ok(false),
    };

    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buffer[offset..offset + 4]);
    let header = FrameHeader::from_bytes(&raw);
    row.bitrate = header.bitrate();
    row.samplerate = header.samplerate();
    row.duration = length(row.bitrate, filesize);

    Ok(true)
}

fn read_id3_tags(path: &Path, row: &mut Row) {
    let tag = match id3::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) => {
            log::debug!("no usable id3 tag in {:?}: {}", path, e);
            id3::Tag::new()
        }
    };

    let artist = tag.artist().map(utf8_to_latin1);
    wide::set_field(
        &mut row.artist,
        artist.as_deref().unwrap_or(DEFAULT_ARTIST.as_bytes()),
    );

    let album = tag.album().map(utf8_to_latin1);
    wide::set_field(
        &mut row.album,
        album.as_deref().unwrap_or(DEFAULT_ALBUM.as_bytes()),
    );

    let title = tag.title().map(utf8_to_latin1);
    wide::set_field(
        &mut row.title,
        title.as_deref().unwrap_or(DEFAULT_TITLE.as_bytes()),
    );

    let genre = tag.genre_parsed().map(|g| utf8_to_latin1(&g));
    wide::set_field(
        &mut row.genre,
        genre.as_deref().unwrap_or(DEFAULT_GENRE.as_bytes()),
    );

    row.track = tag.track().unwrap_or(0);
    row.year = tag.year().map(|y| y.max(0) as u32).unwrap_or(0);
}

/// Fill the audio fields of `row` from an MPEG file.
pub fn fill_row(path: &Path, row: &mut Row) {
    log::trace!("retrieving mpeg information for {:?}", path);

    match read_frame_info(path, row) {
        Ok(true) => {}
        Ok(false) => log::info!("unable to find first frame in {:?}", path),
        Err(e) => log::warn!("unable to read mpeg data from {:?}: {}", path, e),
    }

    read_id3_tags(path, row);
}
