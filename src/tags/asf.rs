//! ASF/WMA extraction
//!
//! Delegates to `lofty`, which parses the ASF header objects properly.
//! A file that lofty cannot read still produces a row: tags fall back to
//! the defaults and the audio properties stay zero.

use std::path::Path;

use lofty::prelude::*;

use crate::codec::charset::utf8_to_latin1;
use crate::codec::wide;
use crate::config::{DEFAULT_ALBUM, DEFAULT_ARTIST, DEFAULT_GENRE, DEFAULT_TITLE};
use crate::db::row::Row;
use crate::paths;
use crate::tags::apply_default_tags;

/// Fill the audio fields of `row` from an ASF file.
pub fn fill_row(path: &Path, row: &mut Row) {
    log::trace!("retrieving asf information for {:?}", path);

    row.filesize = paths::filesize(path) as u32;

    let tagged = match lofty::read_from_path(path) {
        Ok(tagged) => tagged,
        Err(e) => {
            log::info!("unable to parse asf data in {:?}: {}", path, e);
            apply_default_tags(row);
            return;
        }
    };

    let properties = tagged.properties();
    row.bitrate = properties.audio_bitrate().unwrap_or(0) * 1000;
    row.samplerate = properties.sample_rate().unwrap_or(0);
    row.duration = properties.duration().as_secs() as u32;

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

    let artist = tag.and_then(|t| t.artist()).map(|s| utf8_to_latin1(&s));
    wide::set_field(
        &mut row.artist,
        artist.as_deref().unwrap_or(DEFAULT_ARTIST.as_bytes()),
    );

    let album = tag.and_then(|t| t.album()).map(|s| utf8_to_latin1(&s));
    wide::set_field(
        &mut row.album,
        album.as_deref().unwrap_or(DEFAULT_ALBUM.as_bytes()),
    );

    let title = tag.and_then(|t| t.title()).map(|s| utf8_to_latin1(&s));
    wide::set_field(
        &mut row.title,
        title.as_deref().unwrap_or(DEFAULT_TITLE.as_bytes()),
    );

    let genre = tag.and_then(|t| t.genre()).map(|s| utf8_to_latin1(&s));
    wide::set_field(
        &mut row.genre,
        genre.as_deref().unwrap_or(DEFAULT_GENRE.as_bytes()),
    );

    row.track = tag.and_then(|t| t.track()).unwrap_or(0);
    row.year = tag.and_then(|t| t.year()).unwrap_or(0);
}
