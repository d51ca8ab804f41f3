//! Data store
//!
//! Random-access store of fixed-size records in the DAT file. Rows are
//! addressed by 0-based position; inserts append, deletes compact by
//! moving the tail row into the hole. The row count lives in the header
//! store, which this store drives so the two files never drift within a
//! single successful call.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use binrw::{BinRead, BinWrite};

use crate::codec::{crc, wide};
use crate::config::{DAT_FILE, MAX_ENTRIES};
use crate::db::hdr::HdrStore;
use crate::db::row::{Row, FILENAME_WIDTH, RECORD_SIZE};
use crate::error::{DbError, Result};
use crate::paths;

/// One value of a string column, narrowed, with its row position.
pub struct StringEntry {
    pub hidden: u32,
    pub position: u32,
    pub value: Vec<u8>,
    pub crc32: u32,
}

/// One value of a numeric column with its row position.
pub struct NumberEntry {
    pub hidden: u32,
    pub position: u32,
    pub value: u32,
}

pub struct DatStore {
    file: std::fs::File,
    hdr: HdrStore,
}

impl DatStore {
    /// Open the data file and its header inside the database directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let hdr = HdrStore::open(data_dir)?;

        let file = paths::case_open(
            data_dir,
            DAT_FILE,
            OpenOptions::new().read(true).write(true),
        )
        .map_err(|e| {
            log::error!("unable to open data file in {:?}: {}", data_dir, e);
            DbError::Io(e)
        })?;

        Ok(Self { file, hdr })
    }

    pub fn count(&self) -> u32 {
        self.hdr.count()
    }

    /// Direct header access for the checker's count repair.
    pub fn hdr_mut(&mut self) -> &mut HdrStore {
        &mut self.hdr
    }

    /// Read the record at `index`. Fields stay in their wide disk form.
    pub fn select(&mut self, index: u32) -> Result<Row> {
        self.file
            .seek(SeekFrom::Start(index as u64 * RECORD_SIZE))?;
        Row::read(&mut self.file).map_err(DbError::from)
    }

    /// Overwrite the record at `index`.
    pub fn update(&mut self, index: u32, row: &Row) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(index as u64 * RECORD_SIZE))?;
        row.write(&mut self.file)?;
        Ok(())
    }

    /// Append a record and bump the header count.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let count = self.hdr.count();
        if count >= MAX_ENTRIES {
            log::error!("database is full ({} rows)", count);
            return Err(DbError::Full);
        }

        self.file.seek(SeekFrom::Start(count as u64 * RECORD_SIZE))?;
        row.write(&mut self.file)?;

        self.hdr.grow(1)
    }

    /// Remove the record at `index`, compacting with the tail row.
    ///
    /// Row order is not preserved, which is why indexes are rebuilt
    /// wholesale after deletes.
    pub fn delete(&mut self, index: u32) -> Result<()> {
        let count = self.hdr.count();
        if index >= count {
            log::error!("delete index {} outside database of {} rows", index, count);
            return Err(DbError::Invalid("row index out of range"));
        }

        if index != count - 1 {
            let tail = self.select(count - 1)?;
            self.update(index, &tail)?;
        }

        self.hdr.grow(-1)?;
        paths::truncate(&self.file, (count - 1) as u64 * RECORD_SIZE)?;

        Ok(())
    }

    /// Position of the first row whose filename field equals `short`.
    ///
    /// The probe is widened into the exact on-disk form first, so the
    /// scan is a plain byte comparison per row.
    pub fn select_by_filename(&mut self, short: &[u8]) -> Result<u32> {
        let mut probe = [0u8; FILENAME_WIDTH];
        let len = short.len().min(FILENAME_WIDTH / 2);
        probe[..len].copy_from_slice(&short[..len]);
        wide::widen(&mut probe);

        for index in 0..self.hdr.count() {
            let row = self.select(index)?;
            if row.filename == probe {
                return Ok(index);
            }
        }

        Err(DbError::NotFound)
    }

    /// All values of one string column, narrowed, in row order.
    pub fn string_column(&mut self, field: fn(&Row) -> &[u8]) -> Result<Vec<StringEntry>> {
        let count = self.hdr.count();
        let mut entries = Vec::with_capacity(count as usize);

        for position in 0..count {
            let mut row = self.select(position)?;
            let hidden = row.hidden;
            row.narrow_strings();
            let value = wide::field_str(field(&row)).to_vec();
            let crc32 = crc::checksum(&value);
            entries.push(StringEntry {
                hidden,
                position,
                value,
                crc32,
            });
        }

        Ok(entries)
    }

    /// All values of one numeric column in row order.
    pub fn number_column(&mut self, field: fn(&Row) -> u32) -> Result<Vec<NumberEntry>> {
        let count = self.hdr.count();
        let mut entries = Vec::with_capacity(count as usize);

        for position in 0..count {
            let row = self.select(position)?;
            entries.push(NumberEntry {
                hidden: row.hidden,
                position,
                value: field(&row),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HDR_COUNT_OFFSET, HDR_FILE};

    fn fixture() -> (tempfile::TempDir, DatStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut hdr = vec![0u8; 2048];
        hdr[HDR_COUNT_OFFSET as usize..HDR_COUNT_OFFSET as usize + 4]
            .copy_from_slice(&0u32.to_le_bytes());
        std::fs::write(dir.path().join(HDR_FILE), &hdr).unwrap();
        std::fs::write(dir.path().join(DAT_FILE), b"").unwrap();
        let dat = DatStore::open(dir.path()).unwrap();
        (dir, dat)
    }

    fn row_named(name: &[u8], track: u32) -> Row {
        let mut row = Row {
            track,
            ..Row::default()
        };
        wide::set_field(&mut row.filename, name);
        row.widen_strings();
        row
    }

    #[test]
    fn insert_select_round_trip() {
        let (_dir, mut dat) = fixture();

        let row = row_named(b"aa11.mp3", 4);
        dat.insert(&row).unwrap();
        assert_eq!(dat.count(), 1);

        let back = dat.select(0).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn select_past_end_fails() {
        let (_dir, mut dat) = fixture();
        dat.insert(&row_named(b"a.mp3", 0)).unwrap();
        assert!(dat.select(1).is_err());
    }

    #[test]
    fn find_by_filename() {
        let (_dir, mut dat) = fixture();
        dat.insert(&row_named(b"first.mp3", 1)).unwrap();
        dat.insert(&row_named(b"second.mp3", 2)).unwrap();

        assert_eq!(dat.select_by_filename(b"second.mp3").unwrap(), 1);
        assert_eq!(dat.select_by_filename(b"first.mp3").unwrap(), 0);
        assert!(matches!(
            dat.select_by_filename(b"third.mp3"),
            Err(DbError::NotFound)
        ));
    }

    #[test]
    fn delete_compacts_with_tail_row() {
        let (dir, mut dat) = fixture();
        dat.insert(&row_named(b"a.mp3", 1)).unwrap();
        dat.insert(&row_named(b"b.mp3", 2)).unwrap();
        dat.insert(&row_named(b"c.mp3", 3)).unwrap();

        dat.delete(0).unwrap();
        assert_eq!(dat.count(), 2);
        // The tail row moved into the hole.
        assert_eq!(dat.select(0).unwrap().track, 3);
        assert_eq!(dat.select(1).unwrap().track, 2);

        let size = std::fs::metadata(dir.path().join(DAT_FILE)).unwrap().len();
        assert_eq!(size, 2 * RECORD_SIZE);
    }

    #[test]
    fn delete_last_row_truncates_exactly() {
        let (dir, mut dat) = fixture();
        dat.insert(&row_named(b"a.mp3", 1)).unwrap();
        dat.insert(&row_named(b"b.mp3", 2)).unwrap();

        dat.delete(1).unwrap();
        assert_eq!(dat.count(), 1);
        assert_eq!(dat.select(0).unwrap().track, 1);

        let size = std::fs::metadata(dir.path().join(DAT_FILE)).unwrap().len();
        assert_eq!(size, RECORD_SIZE);
    }

    #[test]
    fn delete_only_row_empties_file() {
        let (dir, mut dat) = fixture();
        dat.insert(&row_named(b"a.mp3", 1)).unwrap();

        dat.delete(0).unwrap();
        assert_eq!(dat.count(), 0);
        let size = std::fs::metadata(dir.path().join(DAT_FILE)).unwrap().len();
        assert_eq!(size, 0);
    }

    #[test]
    fn delete_out_of_range() {
        let (_dir, mut dat) = fixture();
        assert!(dat.delete(0).is_err());
    }

    #[test]
    fn column_extraction() {
        let (_dir, mut dat) = fixture();
        dat.insert(&row_named(b"b.mp3", 2)).unwrap();
        dat.insert(&row_named(b"a.mp3", 9)).unwrap();

        let names = dat.string_column(|row| &row.filename).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].value, b"b.mp3");
        assert_eq!(names[0].position, 0);
        assert_eq!(names[1].value, b"a.mp3");
        assert_eq!(names[1].position, 1);
        assert_eq!(names[0].crc32, crc::checksum(b"b.mp3"));

        let tracks = dat.number_column(|row| row.track).unwrap();
        assert_eq!(tracks[0].value, 2);
        assert_eq!(tracks[1].value, 9);
    }
}
