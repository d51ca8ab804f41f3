mod common;

use common::{fresh_device, write_mp3};
use db5fuse::codec::crc;
use db5fuse::codec::wide::field_str;
use db5fuse::db::{Db, RECORD_SIZE};
use db5fuse::DbError;

fn dat_path(device: &std::path::Path) -> std::path::PathBuf {
    device.join("System/DATA/DB5000.DAT")
}

#[test]
fn insert_on_fresh_device_uses_defaults() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();
    assert_eq!(db.count(), 0);

    // MUSIC/song.mp3 does not exist: the row is still created.
    db.insert("song.mp3").unwrap();
    assert_eq!(db.count(), 1);

    let size = std::fs::metadata(dat_path(device.path())).unwrap().len();
    assert_eq!(size, RECORD_SIZE);

    let mut row = db.dat_mut().select(0).unwrap();
    row.narrow_strings();
    assert_eq!(field_str(&row.artist), b"Unknown artist");
    assert_eq!(field_str(&row.album), b"Unknown album");
    assert_eq!(field_str(&row.genre), b"Unknown");
    assert_eq!(field_str(&row.title), b"Unknown title");
    assert_eq!(row.hidden, 0);
    assert_eq!(row.source, 0);

    // The filename field holds the CRC-derived short name.
    let expected_short = format!("{:x}.mp3", crc::checksum(b"song.mp3"));
    assert_eq!(field_str(&row.filename), expected_short.as_bytes());
    assert_eq!(field_str(&row.filepath), b"MUSIC\\");
}

#[test]
fn listing_returns_long_names_in_dat_order() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("song.mp3").unwrap();
    assert_eq!(db.list_longnames().unwrap(), vec!["song.mp3".to_string()]);

    db.insert("Artist - Another Song.mp3").unwrap();
    assert_eq!(
        db.list_longnames().unwrap(),
        vec!["song.mp3".to_string(), "Artist - Another Song.mp3".to_string()]
    );
}

#[test]
fn inserted_names_resolve_to_rows() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("Some Band - Song (live).mp3").unwrap();

    let short = db.resolve_shortname("Some Band - Song (live).mp3").unwrap();
    assert!(db.dat_mut().select_by_filename(&short).is_ok());
    assert!(db.exists("Some Band - Song (live).mp3"));
    assert!(!db.exists("missing.mp3"));
}

#[test]
fn duplicate_insert_fails() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("dup.mp3").unwrap();
    assert!(matches!(db.insert("dup.mp3"), Err(DbError::AlreadyExists)));
    assert_eq!(db.count(), 1);
}

#[test]
fn unsupported_extension_is_invalid() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    assert!(matches!(db.insert("song.ogg"), Err(DbError::Invalid(_))));
    assert!(matches!(db.insert("noext"), Err(DbError::Invalid(_))));
    assert_eq!(db.count(), 0);
}

#[test]
fn leading_dot_marks_hidden() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert(".secret.mp3").unwrap();
    let row = db.dat_mut().select(0).unwrap();
    assert_eq!(row.hidden, 1);
}

#[test]
fn delete_restores_previous_dat_bytes() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("keep.mp3").unwrap();
    let before = std::fs::read(dat_path(device.path())).unwrap();

    db.insert("gone.mp3").unwrap();
    db.delete("gone.mp3").unwrap();

    assert_eq!(db.count(), 1);
    let after = std::fs::read(dat_path(device.path())).unwrap();
    assert_eq!(after, before);
    assert!(!db.exists("gone.mp3"));
    assert!(db.exists("keep.mp3"));
}

#[test]
fn delete_only_row_leaves_empty_dat() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("only.mp3").unwrap();
    db.delete("only.mp3").unwrap();

    assert_eq!(db.count(), 0);
    let size = std::fs::metadata(dat_path(device.path())).unwrap().len();
    assert_eq!(size, 0);
}

#[test]
fn rename_sequence_moves_the_entry() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("a.mp3").unwrap();

    // The callback sequence behind fs_rename("/a.mp3", "/b.mp3").
    assert!(db.exists("a.mp3"));
    assert!(!db.exists("b.mp3"));
    let local_src = db.local_path_of("a.mp3").unwrap();
    db.insert("b.mp3").unwrap();
    let local_dst = db.local_path_of("b.mp3").unwrap();
    // Neither local file exists on this fixture; the rename of the
    // audio file itself is best-effort here.
    let _ = std::fs::rename(&local_src, &local_dst);
    db.delete("a.mp3").unwrap();
    let _ = db.update("b.mp3");

    assert!(!db.exists("a.mp3"));
    assert!(db.exists("b.mp3"));
    assert_eq!(db.count(), 1);
}

#[test]
fn update_refreshes_audio_metadata() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("tune.mp3").unwrap();
    let row = db.dat_mut().select(0).unwrap();
    assert_eq!(row.filesize, 0);

    // Write a real (if minimal) MPEG stream behind the entry, then ask
    // for a refresh the way the flush callback does.
    let local = db.local_path_of("tune.mp3").unwrap();
    write_mp3(&local, 32_000);
    db.update("tune.mp3").unwrap();

    let row = db.dat_mut().select(0).unwrap();
    assert_eq!(row.filesize, 32_000);
    assert_eq!(row.bitrate, 128_000);
    assert_eq!(row.samplerate, 44_100);
    // 32000 bytes at 16000 byte/s
    assert_eq!(row.duration, 2);
    assert_eq!(db.count(), 1);
}

#[test]
fn names_file_tracks_inserts_and_deletes() {
    let device = fresh_device(0);
    let names_path = device.path().join("Names.txt");
    let mut db = Db::open(device.path()).unwrap();

    db.insert("Long Name With Spaces.mp3").unwrap();
    let raw = std::fs::read(&names_path).unwrap();
    let expected = format!(
        "{:x}.mp3\r\nLong Name With Spaces.mp3\r\n",
        crc::checksum(b"Long Name With Spaces.mp3")
    );
    assert_eq!(raw, expected.as_bytes());

    db.delete("Long Name With Spaces.mp3").unwrap();
    let raw = std::fs::read(&names_path).unwrap();
    assert!(raw.is_empty());
}

#[test]
fn latin1_long_names_survive_the_round_trip() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    let name = "Fête à l'été.mp3";
    db.insert(name).unwrap();

    assert_eq!(db.list_longnames().unwrap(), vec![name.to_string()]);
    assert!(db.exists(name));
}

#[test]
fn reindex_writes_sorted_index_files() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.insert("bbb.mp3").unwrap();
    db.insert("AAA.mp3").unwrap();
    db.insert("ccc.mp3").unwrap();
    db.reindex().unwrap();

    let data_dir = device.path().join("System/DATA");
    for code in ["FNAM", "FPTH", "TALB", "TCON", "TIT2", "TPE1", "TRCK", "XSRC"] {
        let path = data_dir.join(format!("DB5000_{}.IDX", code));
        let md = std::fs::metadata(&path)
            .unwrap_or_else(|_| panic!("missing index file {:?}", path));
        assert_eq!(md.len(), 3 * 12, "wrong entry count in {:?}", path);
    }

    // The filename index is sorted by the short names and carries their
    // checksums as uids.
    let mut shorts: Vec<String> = ["bbb.mp3", "AAA.mp3", "ccc.mp3"]
        .iter()
        .map(|n| format!("{:x}.mp3", crc::checksum(n.as_bytes())))
        .collect();

    let raw = std::fs::read(data_dir.join("DB5000_FNAM.IDX")).unwrap();
    let entries: Vec<(u32, u32, u32)> = raw
        .chunks_exact(12)
        .map(|c| {
            (
                u32::from_le_bytes(c[0..4].try_into().unwrap()),
                u32::from_le_bytes(c[4..8].try_into().unwrap()),
                u32::from_le_bytes(c[8..12].try_into().unwrap()),
            )
        })
        .collect();

    shorts.sort_by_key(|s| s.to_ascii_lowercase());
    for (entry, short) in entries.iter().zip(&shorts) {
        assert_eq!(entry.2, crc::checksum(short.as_bytes()));
        assert!(entry.1 < 3);
    }
}

#[test]
fn reindex_of_empty_database_succeeds() {
    let device = fresh_device(0);
    let mut db = Db::open(device.path()).unwrap();

    db.reindex().unwrap();
    let path = device.path().join("System/DATA/DB5000_TRCK.IDX");
    assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
}

#[test]
fn full_database_rejects_inserts() {
    let device = fresh_device(0);
    common::poke_header_count(device.path(), 4_294_967_293);

    let mut db = Db::open(device.path()).unwrap();
    assert!(matches!(db.insert("song.mp3"), Err(DbError::Full)));
}
