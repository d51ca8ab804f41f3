//! Secondary index builder
//!
//! One sorted index file per indexed column, named `DB5000_CCCC.IDX`
//! after the column's 4-byte code. Each file holds `count` 12-byte
//! entries `{hidden, position, uid}`, sorted ascending by the column's
//! byte content. Indexes are rebuilt wholesale on unmount and by the
//! checker; deletes reorder rows, so incremental maintenance would buy
//! nothing.

use std::cmp::Ordering;
use std::fs::OpenOptions;
use std::path::Path;

use binrw::{BinRead, BinWrite};

use crate::db::dat::DatStore;
use crate::db::row::Row;
use crate::error::{DbError, Result};
use crate::paths;

/// One 12-byte entry of an index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct IndexEntry {
    pub hidden: u32,
    pub position: u32,
    pub uid: u32,
}

enum ColumnKind {
    Str(fn(&Row) -> &[u8]),
    Num(fn(&Row) -> u32),
}

struct Column {
    code: [u8; 4],
    kind: ColumnKind,
}

/// The fixed set of indexed columns and their codes.
const COLUMNS: [Column; 8] = [
    Column {
        code: *b"FNAM",
        kind: ColumnKind::Str(|row| &row.filename),
    },
    Column {
        code: *b"FPTH",
        kind: ColumnKind::Str(|row| &row.filepath),
    },
    Column {
        code: *b"TALB",
        kind: ColumnKind::Str(|row| &row.album),
    },
    Column {
        code: *b"TCON",
        kind: ColumnKind::Str(|row| &row.genre),
    },
    Column {
        code: *b"TIT2",
        kind: ColumnKind::Str(|row| &row.title),
    },
    Column {
        code: *b"TPE1",
        kind: ColumnKind::Str(|row| &row.artist),
    },
    Column {
        code: *b"TRCK",
        kind: ColumnKind::Num(|row| row.track),
    },
    Column {
        code: *b"XSRC",
        kind: ColumnKind::Num(|row| row.source),
    },
];

/// File name of the index for a column code.
pub fn index_file_name(code: &[u8; 4]) -> String {
    format!(
        "DB5000_{}{}{}{}.IDX",
        code[0] as char, code[1] as char, code[2] as char, code[3] as char
    )
}

/// ASCII-case-insensitive ordering of two Latin-1 strings.
fn cmp_ignore_ascii_case(a: &[u8], b: &[u8]) -> Ordering {
    let lhs = a.iter().map(u8::to_ascii_lowercase);
    let rhs = b.iter().map(u8::to_ascii_lowercase);
    lhs.cmp(rhs)
}

fn write_entries(data_dir: &Path, code: &[u8; 4], entries: &[IndexEntry]) -> Result<()> {
    let name = index_file_name(code);
    let mut file = paths::case_open(
        data_dir,
        &name,
        OpenOptions::new().write(true).create(true).truncate(true),
    )
    .map_err(|e| {
        log::error!("unable to create index file '{}': {}", name, e);
        DbError::Io(e)
    })?;

    for entry in entries {
        entry.write(&mut file)?;
    }

    Ok(())
}

fn index_string_column(
    dat: &mut DatStore,
    data_dir: &Path,
    code: &[u8; 4],
    field: fn(&Row) -> &[u8],
) -> Result<()> {
    let mut values = dat.string_column(field)?;
    values.sort_by(|a, b| cmp_ignore_ascii_case(&a.value, &b.value));

    let entries: Vec<IndexEntry> = values
        .iter()
        .map(|v| IndexEntry {
            hidden: v.hidden,
            position: v.position,
            uid: v.crc32,
        })
        .collect();

    write_entries(data_dir, code, &entries)
}

fn index_number_column(
    dat: &mut DatStore,
    data_dir: &Path,
    code: &[u8; 4],
    field: fn(&Row) -> u32,
) -> Result<()> {
    let mut values = dat.number_column(field)?;
    // The comparator is signed; large values wrap, which the device
    // accepts.
    values.sort_by_key(|v| v.value as i32);

    let entries: Vec<IndexEntry> = values
        .iter()
        .map(|v| IndexEntry {
            hidden: v.hidden,
            position: v.position,
            uid: v.value,
        })
        .collect();

    write_entries(data_dir, code, &entries)
}

/// Rebuild every index. Succeeds iff all eight columns index cleanly;
/// on failure, partially written files are left behind for the next
/// successful rebuild to overwrite.
pub fn reindex_all(dat: &mut DatStore, data_dir: &Path) -> Result<()> {
    for column in &COLUMNS {
        let result = match column.kind {
            ColumnKind::Str(field) => index_string_column(dat, data_dir, &column.code, field),
            ColumnKind::Num(field) => index_number_column(dat, data_dir, &column.code, field),
        };
        if let Err(e) = result {
            log::error!(
                "error generating index '{}': {}",
                index_file_name(&column.code),
                e
            );
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_code() {
        assert_eq!(index_file_name(b"FNAM"), "DB5000_FNAM.IDX");
        assert_eq!(index_file_name(b"TPE1"), "DB5000_TPE1.IDX");
    }

    #[test]
    fn case_insensitive_ordering() {
        assert_eq!(cmp_ignore_ascii_case(b"abc", b"ABD"), Ordering::Less);
        assert_eq!(cmp_ignore_ascii_case(b"ZZ", b"aa"), Ordering::Greater);
        assert_eq!(cmp_ignore_ascii_case(b"Same", b"sAME"), Ordering::Equal);
        assert_eq!(cmp_ignore_ascii_case(b"a", b"ab"), Ordering::Less);
    }

    #[test]
    fn entry_is_twelve_bytes() {
        let entry = IndexEntry {
            hidden: 1,
            position: 2,
            uid: 0xDEADBEEF,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        entry.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &0xDEADBEEFu32.to_le_bytes());
    }
}
