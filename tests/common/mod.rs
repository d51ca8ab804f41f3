//! Shared fixtures: a fresh device tree in a temp directory.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub const HDR_COUNT_OFFSET: usize = 1040;

/// Build a device with an empty DAT, a blank header blob carrying
/// `count`, and an empty music directory.
pub fn fresh_device(count: u32) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp device");
    let data_dir = dir.path().join("System/DATA");
    fs::create_dir_all(&data_dir).unwrap();

    let mut hdr = vec![0u8; 2048];
    hdr[HDR_COUNT_OFFSET..HDR_COUNT_OFFSET + 4].copy_from_slice(&count.to_le_bytes());
    fs::write(data_dir.join("DB5000.HDR"), &hdr).unwrap();
    fs::write(data_dir.join("DB5000.DAT"), b"").unwrap();

    fs::create_dir_all(dir.path().join("MUSIC")).unwrap();
    dir
}

/// Overwrite the row count slot in the header file.
pub fn poke_header_count(device: &Path, count: u32) {
    let hdr_path = device.join("System/DATA/DB5000.HDR");
    let mut hdr = fs::read(&hdr_path).unwrap();
    hdr[HDR_COUNT_OFFSET..HDR_COUNT_OFFSET + 4].copy_from_slice(&count.to_le_bytes());
    fs::write(&hdr_path, &hdr).unwrap();
}

/// A minimal MPEG stream: one valid frame header
/// (MPEG-1 Layer III, 128 kbit/s, 44100 Hz) followed by padding.
pub fn write_mp3(path: &Path, payload_len: usize) {
    let mut data = vec![0u8; payload_len];
    if payload_len >= 4 {
        data[0..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    }
    fs::write(path, &data).unwrap();
}
