//! Header store
//!
//! The device header file is opaque except for one slot: the 32-bit
//! little-endian row count at offset 1040. It is read once at open and
//! written back (and flushed) after every mutation, which makes it the
//! atomicity boundary for DAT edits.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::{HDR_COUNT_OFFSET, HDR_FILE};
use crate::error::{DbError, Result};
use crate::paths;

pub struct HdrStore {
    file: File,
    count: u32,
}

impl HdrStore {
    /// Open the header file inside the database directory and read the
    /// row count.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let mut file = paths::case_open(
            data_dir,
            HDR_FILE,
            OpenOptions::new().read(true).write(true),
        )
        .map_err(|e| {
            log::error!("unable to open header file in {:?}: {}", data_dir, e);
            DbError::Io(e)
        })?;

        file.seek(SeekFrom::Start(HDR_COUNT_OFFSET))?;
        let mut raw = [0u8; 4];
        file.read_exact(&mut raw)
            .map_err(|_| DbError::Corrupt("header file too short for row count"))?;
        let count = u32::from_le_bytes(raw);

        if count == 0 {
            log::info!("header reports an empty database");
        }

        Ok(Self { file, count })
    }

    /// Current row count.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Apply a signed delta to the row count and persist it.
    pub fn grow(&mut self, delta: i64) -> Result<()> {
        self.count = (self.count as i64 + delta) as u32;

        self.file.seek(SeekFrom::Start(HDR_COUNT_OFFSET))?;
        self.file.write_all(&self.count.to_le_bytes())?;
        self.file.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(count: u32) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut hdr = vec![0u8; 2048];
        hdr[HDR_COUNT_OFFSET as usize..HDR_COUNT_OFFSET as usize + 4]
            .copy_from_slice(&count.to_le_bytes());
        std::fs::write(dir.path().join(HDR_FILE), &hdr).unwrap();
        dir
    }

    #[test]
    fn reads_count_at_offset() {
        let dir = fixture(42);
        let hdr = HdrStore::open(dir.path()).unwrap();
        assert_eq!(hdr.count(), 42);
    }

    #[test]
    fn grow_persists() {
        let dir = fixture(3);
        {
            let mut hdr = HdrStore::open(dir.path()).unwrap();
            hdr.grow(2).unwrap();
            assert_eq!(hdr.count(), 5);
            hdr.grow(-5).unwrap();
            assert_eq!(hdr.count(), 0);
            hdr.grow(1).unwrap();
        }
        let hdr = HdrStore::open(dir.path()).unwrap();
        assert_eq!(hdr.count(), 1);
    }

    #[test]
    fn short_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HDR_FILE), b"tiny").unwrap();
        assert!(matches!(
            HdrStore::open(dir.path()),
            Err(DbError::Corrupt(_))
        ));
    }
}
