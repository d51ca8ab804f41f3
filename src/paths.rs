//! Path utilities
//!
//! Device volumes come from FAT media written by assorted firmware and
//! operating systems, so file names are matched case-insensitively and
//! the database stores backslash-separated paths.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Split a Latin-1 path into `(dir, stem, ext)` on the last `/` and the
/// last `.`. Missing pieces are empty; the separators are consumed.
pub fn explode(path: &[u8]) -> (&[u8], &[u8], &[u8]) {
    let (dir, file) = match path.iter().rposition(|&b| b == b'/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => (&path[..0], path),
    };
    let (stem, ext) = match file.iter().rposition(|&b| b == b'.') {
        Some(pos) => (&file[..pos], &file[pos + 1..]),
        None => (file, &file[..0]),
    };
    (dir, stem, ext)
}

/// Extension of a Latin-1 file name, including the dot; empty if absent.
pub fn extension(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'.') {
        Some(pos) => &path[pos..],
        None => &path[..0],
    }
}

/// Resolve `name` inside `dir` ignoring ASCII case.
///
/// Scans the directory once and returns the first entry whose name
/// compares equal; falls back to the literal `dir/name` so creating
/// modes still work when no entry matches.
pub fn case_resolve(dir: &Path, name: &str) -> PathBuf {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let entry_name = entry.file_name();
            if let Some(entry_str) = entry_name.to_str() {
                if entry_str.eq_ignore_ascii_case(name) {
                    return dir.join(entry_str);
                }
            }
        }
    }
    dir.join(name)
}

/// Open `name` inside `dir` with a case-insensitive lookup.
pub fn case_open(dir: &Path, name: &str, options: &OpenOptions) -> io::Result<File> {
    options.open(case_resolve(dir, name))
}

/// Replace every `/` with `\` in place.
pub fn to_backslashes(path: &mut [u8]) {
    for byte in path.iter_mut() {
        if *byte == b'/' {
            *byte = b'\\';
        }
    }
}

/// Shrink or extend an open file to `len` bytes.
pub fn truncate(file: &File, len: u64) -> io::Result<()> {
    file.set_len(len)
}

/// Drop every leading `/` from a virtual path.
pub fn strip_leading_slashes(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Existence probe.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Size of the file at `path`; 0 and a log entry on failure.
pub fn filesize(path: &Path) -> u64 {
    match std::fs::metadata(path) {
        Ok(md) => md.len(),
        Err(e) => {
            log::warn!("unable to stat {:?}: {}", path, e);
            0
        }
    }
}

/// Size of an already-open file; 0 and a log entry on failure.
pub fn filesize_of(file: &File) -> u64 {
    match file.metadata() {
        Ok(md) => md.len(),
        Err(e) => {
            log::warn!("unable to fstat open file: {}", e);
            0
        }
    }
}
