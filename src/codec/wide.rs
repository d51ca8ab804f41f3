//! Widen/narrow transforms for DAT string fields
//!
//! Record strings are stored as UTF-16-LE-padded Latin-1: every Latin-1
//! byte is followed by a 0x00 byte up to the field width, NUL-padded but
//! not NUL-terminated. Both transforms work in place so a record buffer
//! can flip between its disk form and its Latin-1 form without copying.

/// Spread the first `buf.len() / 2` bytes of `buf` over the full width,
/// inserting a 0x00 after each byte.
///
/// Must run back to front: target slot `2i` is source slot `i`, and a
/// forward pass would overwrite sources it has not read yet.
pub fn widen(buf: &mut [u8]) {
    let half = buf.len() / 2;
    for i in (0..half).rev() {
        buf[2 * i] = buf[i];
        buf[2 * i + 1] = 0;
    }
}

/// Inverse of [`widen`]: collapse the even-indexed bytes into the front
/// half and NUL-terminate at `buf.len() / 2`.
pub fn narrow(buf: &mut [u8]) {
    let half = buf.len() / 2;
    for i in 1..half {
        buf[i] = buf[2 * i];
    }
    if half < buf.len() {
        buf[half] = 0;
    }
}

/// Byte-reversed copy of `src` into `dst`.
///
/// Interprets a big-endian byte stream as a little-endian value: the
/// 4-byte MPEG frame header arrives most-significant-byte first and is
/// decoded as a little-endian bitfield after this swap.
pub fn swap_copy(dst: &mut [u8], src: &[u8]) {
    let len = dst.len().min(src.len());
    for i in 0..len {
        dst[i] = src[len - i - 1];
    }
}

/// Latin-1 bytes of a narrow-form field, up to the first NUL.
pub fn field_str(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Write `src` into a field in narrow form, truncating to
/// `field.len() / 2 - 1` bytes so a NUL always survives [`widen`].
pub fn set_field(field: &mut [u8], src: &[u8]) {
    field.fill(0);
    let cap = field.len() / 2 - 1;
    let len = src.len().min(cap);
    field[..len].copy_from_slice(&src[..len]);
}
