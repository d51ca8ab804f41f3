//! CRC-32 checksums
//!
//! Reflected CRC-32 over polynomial 0x04C11DB7, initial value 0xFFFFFFFF,
//! final XOR 0xFFFFFFFF. This is the checksum the device uses for short
//! names and index uids, so the parameters are not negotiable.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// Generator polynomial, MSB-first notation.
const POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Chunk size for file checksums.
const FILE_BUFFER_SIZE: usize = 10 * 1024;

static TABLE: OnceLock<[u32; 256]> = OnceLock::new();

/// Invert the bit order of the low `bits` bits of `value`.
fn reflect(mut value: u32, bits: u32) -> u32 {
    let mut result = 0;
    for _ in 0..bits {
        result = (result << 1) | (value & 1);
        value >>= 1;
    }
    result
}

fn table() -> &'static [u32; 256] {
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut entry = reflect(i as u32, 8) << 24;
            for _ in 0..8 {
                entry = (entry << 1) ^ if entry & 0x8000_0000 != 0 { POLYNOMIAL } else { 0 };
            }
            *slot = reflect(entry, 32);
        }
        table
    })
}

/// Continue a checksum over another chunk.
///
/// `update(update(0, a), b) == checksum(a ++ b)` for any split point.
pub fn update(crc: u32, data: &[u8]) -> u32 {
    let table = table();
    let mut crc = !crc;
    for &byte in data {
        crc = (crc >> 8) ^ table[((crc ^ byte as u32) & 0xff) as usize];
    }
    !crc
}

/// CRC-32 of a byte buffer.
pub fn checksum(data: &[u8]) -> u32 {
    update(0, data)
}

/// CRC-32 of a file, streamed in [`FILE_BUFFER_SIZE`] chunks.
///
/// Returns 0 and logs if the file cannot be opened or read.
pub fn checksum_file(path: &Path) -> u32 {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("unable to open file {:?} for checksum: {}", path, e);
            return 0;
        }
    };

    let mut buffer = [0u8; FILE_BUFFER_SIZE];
    let mut crc = 0;
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => crc = update(crc, &buffer[..n]),
            Err(e) => {
                log::warn!("error reading {:?} for checksum: {}", path, e);
                return 0;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn check_value() {
        // The standard CRC-32 check value.
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn stable_across_chunk_sizes() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = checksum(data);
        for split in 0..data.len() {
            let (a, b) = data.split_at(split);
            assert_eq!(update(update(0, a), b), whole, "split at {}", split);
        }
    }

    #[test]
    fn missing_file_is_zero() {
        assert_eq!(checksum_file(Path::new("/nonexistent/nowhere.bin")), 0);
    }
}
