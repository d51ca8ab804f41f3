//! Error taxonomy
//!
//! Every fallible operation in the database layer returns [`DbError`].
//! The mapping to an errno happens once, at the FUSE boundary; nothing
//! below it ever sees a raw error code.

use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Name resolution or an I/O target came up empty.
    #[error("not found")]
    NotFound,

    /// Insert or rename collided with an existing entry.
    #[error("already exists")]
    AlreadyExists,

    /// An underlying read/write/stat/truncate failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Unsupported extension, bad tag, bad argument.
    #[error("invalid: {0}")]
    Invalid(&'static str),

    /// The data file is at its maximum row count.
    #[error("database is full")]
    Full,

    /// Short read, bad record, invalid row count.
    #[error("corrupt database: {0}")]
    Corrupt(&'static str),
}

impl DbError {
    /// Errno for the FUSE reply. Only the bridge calls this.
    pub fn errno(&self) -> i32 {
        match self {
            DbError::NotFound => libc::ENOENT,
            DbError::AlreadyExists => libc::EEXIST,
            DbError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            DbError::Invalid(_) => libc::EINVAL,
            DbError::Full => libc::ENOSPC,
            DbError::Corrupt(_) => libc::EIO,
        }
    }
}

impl From<binrw::Error> for DbError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => DbError::Io(io),
            _ => DbError::Corrupt("malformed record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(DbError::NotFound.errno(), libc::ENOENT);
        assert_eq!(DbError::AlreadyExists.errno(), libc::EEXIST);
        assert_eq!(DbError::Full.errno(), libc::ENOSPC);
        assert_eq!(DbError::Corrupt("x").errno(), libc::EIO);
        assert_eq!(DbError::Invalid("x").errno(), libc::EINVAL);

        let io = DbError::Io(io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(io.errno(), libc::EACCES);
    }
}
