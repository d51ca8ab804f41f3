//! Database orchestration
//!
//! Composes the four stores (header, data, names, indexes) and owns the
//! rules that keep them consistent through every mutating call: row
//! generation, long↔short name resolution, insert/update/delete and
//! wholesale reindexing.

use std::path::{Path, PathBuf};

use crate::codec::charset::{latin1_to_utf8, utf8_to_latin1};
use crate::codec::wide;
use crate::config::{ASF_EXT, DATA_DIR, MPEG_EXT, MUSIC_PATH};
use crate::db::dat::DatStore;
use crate::db::names::{self, NamesStore};
use crate::db::row::Row;
use crate::db::idx;
use crate::error::{DbError, Result};
use crate::paths;
use crate::tags::{self, TagKind};

pub struct Db {
    dat: DatStore,
    names: NamesStore,
    device_root: PathBuf,
    data_dir: PathBuf,
    music_dir: PathBuf,
}

impl Db {
    /// Open the database files under `device_root`.
    ///
    /// The names table may be absent (fresh device); the data and header
    /// files may not.
    pub fn open(device_root: &Path) -> Result<Self> {
        let data_dir = device_root.join(DATA_DIR);
        let dat = DatStore::open(&data_dir)?;
        let names = NamesStore::load(device_root);

        Ok(Self {
            dat,
            names,
            device_root: device_root.to_path_buf(),
            data_dir,
            music_dir: device_root.join(MUSIC_PATH),
        })
    }

    /// Number of rows.
    pub fn count(&self) -> u32 {
        self.dat.count()
    }

    /// Whether `longname` resolves to a database row.
    pub fn exists(&mut self, longname: &str) -> bool {
        self.resolve_shortname(longname).is_ok()
    }

    /// Every long name, in DAT order.
    pub fn list_longnames(&mut self) -> Result<Vec<String>> {
        let count = self.dat.count();
        let mut result = Vec::with_capacity(count as usize);

        for index in 0..count {
            let mut row = self.dat.select(index)?;
            row.narrow_strings();
            let short = wide::field_str(&row.filename);
            result.push(latin1_to_utf8(self.names.longname_of(short)));
        }

        log::debug!("listing returns {} file(s)", count);
        Ok(result)
    }

    /// Add a row for `longname`, registering a names entry if needed.
    pub fn insert(&mut self, longname: &str) -> Result<()> {
        let latin1 = utf8_to_latin1(longname);

        let short = match self.names.shortname_of(&latin1) {
            Some(short) => short,
            None => {
                self.names.insert(&latin1);
                names::generate_shortname(&latin1)
            }
        };

        if self.dat.select_by_filename(&short).is_ok() {
            log::warn!("file '{}' already exists", longname);
            return Err(DbError::AlreadyExists);
        }

        let localfile = self.shortname_to_localfile(&short);
        let mut row = self.build_row(&localfile)?;
        row.hidden = longname.starts_with('.') as u32;
        row.widen_strings();

        self.dat.insert(&row)
    }

    /// Refresh the row of `longname` from its local file, in place.
    pub fn update(&mut self, longname: &str) -> Result<()> {
        let short = self.resolve_shortname(longname)?;
        let index = self.dat.select_by_filename(&short)?;
        log::debug!("updating database entry {}", index);

        let localfile = self.shortname_to_localfile(&short);
        let mut row = self.build_row(&localfile)?;
        row.hidden = longname.starts_with('.') as u32;
        row.widen_strings();

        self.dat.update(index, &row)
    }

    /// Remove the row and names entry of `longname`.
    pub fn delete(&mut self, longname: &str) -> Result<()> {
        let short = self.resolve_shortname(longname)?;
        let index = self.dat.select_by_filename(&short)?;

        self.dat.delete(index)?;

        if !self.names.delete(&utf8_to_latin1(longname)) {
            log::warn!("unable to remove '{}' from names database", longname);
        }

        Ok(())
    }

    /// Rebuild all eight column indexes.
    pub fn reindex(&mut self) -> Result<()> {
        idx::reindex_all(&mut self.dat, &self.data_dir)
    }

    /// Resolve a long name to the short name of an existing row.
    ///
    /// Tried in order, first candidate present in the DAT wins:
    /// 1. the CRC-derived short name,
    /// 2. the long name itself (names short enough to store directly),
    /// 3. the names-table entry.
    pub fn resolve_shortname(&mut self, longname: &str) -> Result<Vec<u8>> {
        let latin1 = utf8_to_latin1(longname);

        let generated = names::generate_shortname(&latin1);
        if self.dat.select_by_filename(&generated).is_ok() {
            log::trace!("'{}' resolved by checksum", longname);
            return Ok(generated);
        }

        if self.dat.select_by_filename(&latin1).is_ok() {
            log::trace!("'{}' resolved by its own name", longname);
            return Ok(latin1);
        }

        if let Some(short) = self.names.shortname_of(&latin1) {
            if self.dat.select_by_filename(&short).is_ok() {
                log::trace!("'{}' resolved by the names table", longname);
                return Ok(short);
            }
        }

        log::info!("file '{}' not found", longname);
        Err(DbError::NotFound)
    }

    /// Absolute path of the audio file behind `longname`.
    pub fn local_path_of(&mut self, longname: &str) -> Result<PathBuf> {
        let short = self.resolve_shortname(longname)?;
        Ok(self.shortname_to_localfile(&short))
    }

    /// Absolute path of the audio file for a short name.
    pub fn shortname_to_localfile(&self, short: &[u8]) -> PathBuf {
        self.music_dir.join(latin1_to_utf8(short))
    }

    /// Generate a row from a local audio file.
    ///
    /// Rejects extensions other than mp3/wma. A missing file still
    /// yields a row with default tag values; so does a file whose tags
    /// cannot be parsed.
    pub fn build_row(&self, localfile: &Path) -> Result<Row> {
        log::trace!("building information for {:?}", localfile);

        // The record stores the path as the device sees it, relative to
        // its own root.
        let relative = localfile.strip_prefix(&self.device_root).unwrap_or(localfile);
        let latin1 = utf8_to_latin1(&relative.to_string_lossy());
        let (dir, stem, ext) = paths::explode(&latin1);

        if ext.is_empty() {
            log::warn!("unable to get extension of {:?}", localfile);
        }
        let kind = TagKind::from_extension(ext).ok_or_else(|| {
            log::error!(
                "extension '{}' is not {} or {}",
                latin1_to_utf8(ext),
                MPEG_EXT,
                ASF_EXT
            );
            DbError::Invalid("unsupported extension")
        })?;

        let mut row = Row::default();

        let mut filepath = dir.to_vec();
        filepath.push(b'/');
        paths::to_backslashes(&mut filepath);
        wide::set_field(&mut row.filepath, &filepath);

        let mut filename = stem.to_vec();
        filename.push(b'.');
        filename.extend_from_slice(ext);
        wide::set_field(&mut row.filename, &filename);

        if !paths::exists(localfile) {
            log::warn!(
                "unable to get information from {:?}, default values will be used",
                localfile
            );
            tags::apply_default_tags(&mut row);
            return Ok(row);
        }

        kind.fill_row(localfile, &mut row);
        row.trace_dump();

        Ok(row)
    }

    /// Music directory of this device.
    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Database directory of this device.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Direct access to the data store (checker only).
    pub fn dat_mut(&mut self) -> &mut DatStore {
        &mut self.dat
    }

    /// Read access to the names table.
    pub fn names(&self) -> &NamesStore {
        &self.names
    }
}
