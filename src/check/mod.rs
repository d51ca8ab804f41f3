//! Offline database checker
//!
//! Five sequential phases over a mounted device, each reporting problems
//! and, in fix mode, repairing them:
//!
//! 1. header row count vs rows physically readable,
//! 2. existence of the music directory,
//! 3. every row's local audio file exists; rows refreshed when fixing,
//! 4. orphan audio files adopted into the database,
//! 5. index rebuild (fix mode only).
//!
//! The checker is the canonical recovery path: mutating filesystem calls
//! fail fast and leave the disk in a state these phases can repair.

use std::fs::{DirBuilder, OpenOptions};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::codec::charset::{latin1_to_utf8, utf8_to_latin1};
use crate::codec::wide;
use crate::config::MUSIC_PATH;
use crate::db::row::FILENAME_WIDTH;
use crate::db::Db;
use crate::error::{DbError, Result};
use crate::paths;
use crate::tags::TagKind;

pub struct Checker {
    db: Db,
    music_dir: PathBuf,
    fix: bool,
    /// Rows physically readable from the DAT file; set by phase 1.
    real_count: u32,
    /// Problems seen so far, repaired or not.
    problems: u32,
}

impl Checker {
    /// Open the database on `device_root` for checking.
    pub fn open(device_root: &Path, fix: bool) -> Result<Self> {
        let db = Db::open(device_root)?;
        Ok(Self {
            music_dir: device_root.join(MUSIC_PATH),
            db,
            fix,
            real_count: 0,
            problems: 0,
        })
    }

    /// Run all five phases. Returns the number of problems found.
    pub fn run(&mut self) -> Result<u32> {
        log::info!("step 1: check number of files");
        self.check_count()?;
        log::info!("step 2: check music directory");
        self.check_music_dir()?;
        log::info!("step 3: check file existence and refresh information");
        self.check_local_files()?;
        log::info!("step 4: search for orphan files");
        self.check_orphans()?;
        log::info!("step 5: regenerate indexes");
        self.rebuild_indexes()?;

        Ok(self.problems)
    }

    /// Phase 1: scan rows until the first failing read; that index is
    /// the number of rows actually present. Repair the header if it
    /// disagrees.
    fn check_count(&mut self) -> Result<()> {
        let header_count = self.db.count();
        log::debug!("{} file(s) registered", header_count);

        let mut index = 0u32;
        while self.db.dat_mut().select(index).is_ok() {
            index += 1;
        }
        self.real_count = index;
        log::debug!("{} file(s) detected", self.real_count);

        if self.real_count != header_count {
            self.problems += 1;
            if self.fix {
                log::warn!("correcting the number of files to {}", self.real_count);
                self.db
                    .dat_mut()
                    .hdr_mut()
                    .grow(self.real_count as i64 - header_count as i64)?;
            } else {
                log::warn!("number of files should be {}", self.real_count);
            }
        }

        Ok(())
    }

    /// Phase 2: the music directory must exist and be a directory.
    fn check_music_dir(&mut self) -> Result<()> {
        match std::fs::metadata(&self.music_dir) {
            Ok(md) if md.is_dir() => {
                log::debug!("directory {:?} found", self.music_dir);
                Ok(())
            }
            Ok(_) => {
                log::error!("{:?} is not a directory", self.music_dir);
                Err(DbError::Invalid("music path is not a directory"))
            }
            Err(_) if self.fix => {
                self.problems += 1;
                log::warn!("creating directory {:?}", self.music_dir);
                DirBuilder::new()
                    .mode(0o755)
                    .create(&self.music_dir)
                    .map_err(|e| {
                        log::error!("unable to create directory {:?}: {}", self.music_dir, e);
                        DbError::Io(e)
                    })
            }
            Err(_) => {
                self.problems += 1;
                log::error!("directory {:?} should exist", self.music_dir);
                Err(DbError::NotFound)
            }
        }
    }

    /// Phase 3: every row's local file must exist. In fix mode, missing
    /// files are recreated empty and every row is refreshed from disk.
    fn check_local_files(&mut self) -> Result<()> {
        for index in 0..self.real_count {
            let mut row = self.db.dat_mut().select(index)?;
            row.narrow_strings();
            let short = wide::field_str(&row.filename).to_vec();
            let localfile = self.db.shortname_to_localfile(&short);

            if !paths::exists(&localfile) {
                self.problems += 1;
                log::warn!("local file of entry {} does not exist: {:?}", index, localfile);

                if self.fix {
                    match OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .mode(0o644)
                        .open(&localfile)
                    {
                        Ok(_) => log::info!("file {:?} recreated", localfile),
                        Err(e) => {
                            log::error!("unable to recreate file {:?}: {}", localfile, e);
                            continue;
                        }
                    }
                }
            }

            if self.fix {
                let longname = latin1_to_utf8(self.db.names().longname_of(&short));
                match self.db.build_row(&localfile) {
                    Ok(mut fresh) => {
                        fresh.hidden = longname.starts_with('.') as u32;
                        fresh.widen_strings();
                        self.db.dat_mut().update(index, &fresh)?;
                    }
                    Err(e) => {
                        log::warn!("unable to refresh entry {}: {}", index, e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Phase 4: audio files in the music directory that no row points
    /// at. Only names short enough for the filename field qualify.
    fn check_orphans(&mut self) -> Result<()> {
        for entry in WalkDir::new(&self.music_dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::error!("unable to scan music directory: {}", e);
                    return Err(DbError::Invalid("music directory not readable"));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let latin1 = utf8_to_latin1(&name);
            let (_, _, ext) = paths::explode(&latin1);

            if TagKind::from_extension(ext).is_none() {
                continue;
            }
            if latin1.len() > FILENAME_WIDTH / 2 {
                log::debug!("'{}' is too long for the database, skipped", name);
                continue;
            }

            match self.db.dat_mut().select_by_filename(&latin1) {
                Ok(_) => continue,
                Err(DbError::NotFound) => {}
                Err(e) => return Err(e),
            }

            self.problems += 1;
            log::warn!("file '{}' is not in the database", name);

            if self.fix {
                let localfile = self.db.shortname_to_localfile(&latin1);
                let mut row = self.db.build_row(&localfile)?;
                row.hidden = latin1.first().is_some_and(|&b| b == b'.') as u32;
                row.widen_strings();
                self.db.dat_mut().insert(&row)?;
                log::info!("file '{}' added", name);
            }
        }

        Ok(())
    }

    /// Phase 5: rebuild the column indexes; read-only mode skips it.
    fn rebuild_indexes(&mut self) -> Result<()> {
        if self.fix {
            self.db.reindex()
        } else {
            log::debug!("read-only, index rebuild skipped");
            Ok(())
        }
    }
}
