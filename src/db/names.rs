//! Long-name translation table
//!
//! The device caps on-disk names at the filename field width, so every
//! user-facing long name is paired with a short name derived from its
//! CRC-32. The pairs live in a CRLF text file at the device root:
//! `"<hex crc><ext>\r\n<longname>\r\n"` per entry, long names in Latin-1.
//!
//! Iteration order is insertion order and the first match wins; duplicate
//! long names are permitted and shadowed. Every mutation rewrites the
//! whole file.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::codec::crc;
use crate::config::NAMES_FILE;
use crate::paths;

struct NameEntry {
    crc32: u32,
    longname: Vec<u8>,
}

pub struct NamesStore {
    entries: Vec<NameEntry>,
    /// Resolved path of the backing file, honouring existing case.
    path: PathBuf,
}

/// Leading hexadecimal run of `s` as a u32; stops at the first non-hex
/// byte. Overlong runs saturate.
fn parse_hex_prefix(s: &[u8]) -> u32 {
    let mut value: u64 = 0;
    for &b in s {
        let digit = match b {
            b'0'..=b'9' => (b - b'0') as u64,
            b'a'..=b'f' => (b - b'a' + 10) as u64,
            b'A'..=b'F' => (b - b'A' + 10) as u64,
            _ => break,
        };
        value = (value << 4) | digit;
        if value > u32::MAX as u64 {
            return u32::MAX;
        }
    }
    value as u32
}

/// Short name for a long name: lowercase-hex CRC-32 of the Latin-1 bytes
/// followed by the original extension, dot included.
pub fn generate_shortname(longname: &[u8]) -> Vec<u8> {
    let mut short = format!("{:x}", crc::checksum(longname)).into_bytes();
    short.extend_from_slice(paths::extension(longname));
    short
}

impl NamesStore {
    /// Load the table from the device root. A missing file is an empty
    /// store, never an error: a fresh device has no names yet.
    pub fn load(device_root: &Path) -> Self {
        let path = paths::case_resolve(device_root, NAMES_FILE);

        let mut entries = Vec::new();
        match OpenOptions::new().read(true).open(&path) {
            Ok(mut file) => {
                let mut raw = Vec::new();
                if let Err(e) = file.read_to_end(&mut raw) {
                    log::warn!("error reading names file {:?}: {}", path, e);
                }
                let mut lines = raw
                    .split(|&b| b == b'\n')
                    .map(|line| line.strip_suffix(b"\r").unwrap_or(line));
                while let (Some(short), Some(long)) = (lines.next(), lines.next()) {
                    if short.is_empty() && long.is_empty() {
                        continue;
                    }
                    entries.push(NameEntry {
                        crc32: parse_hex_prefix(short),
                        longname: long.to_vec(),
                    });
                }
            }
            Err(e) => {
                log::warn!("unable to load names file {:?}: {}", path, e);
            }
        }

        if entries.is_empty() {
            log::info!("name database is empty");
        }

        Self { entries, path }
    }

    /// Append an entry for `longname` and persist. A save failure is
    /// logged but does not lose the in-memory entry.
    pub fn insert(&mut self, longname: &[u8]) {
        self.entries.push(NameEntry {
            crc32: crc::checksum(longname),
            longname: longname.to_vec(),
        });

        if let Err(e) = self.save() {
            log::warn!("error while saving names list: {}", e);
        }
    }

    /// Remove the first entry whose long name equals `longname` exactly.
    /// Returns whether a removal happened.
    pub fn delete(&mut self, longname: &[u8]) -> bool {
        match self.entries.iter().position(|e| e.longname == longname) {
            Some(index) => {
                self.entries.remove(index);
                if let Err(e) = self.save() {
                    log::warn!("error while saving names list: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Short name recorded for `longname`, if any.
    pub fn shortname_of(&self, longname: &[u8]) -> Option<Vec<u8>> {
        let entry = self.entries.iter().find(|e| e.longname == longname)?;
        let mut short = format!("{:x}", entry.crc32).into_bytes();
        short.extend_from_slice(paths::extension(longname));
        Some(short)
    }

    /// Long name behind `short`, or `short` itself when it does not
    /// parse as a short name or is unknown.
    ///
    /// The two cases are deliberately indistinguishable so plain ASCII
    /// file names pass through untranslated.
    pub fn longname_of<'a>(&'a self, short: &'a [u8]) -> &'a [u8] {
        let crc32 = parse_hex_prefix(short);
        if crc32 == 0 {
            return short;
        }
        match self.entries.iter().find(|e| e.crc32 == crc32) {
            Some(entry) => &entry.longname,
            None => short,
        }
    }

    /// Rewrite the backing file from the in-memory list.
    pub fn save(&self) -> std::io::Result<()> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(format!("{:x}", entry.crc32).as_bytes());
            out.extend_from_slice(paths::extension(&entry.longname));
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&entry.longname);
            out.extend_from_slice(b"\r\n");
        }
        std::fs::write(&self.path, out)
    }
}
