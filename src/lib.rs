//! db5fuse - a proprietary media-player library as a filesystem
//!
//! Exposes the db5 database of early portable media players (one DAT
//! file of fixed records, a header with the row count, per-column sorted
//! indexes and a long-name table) as a flat virtual directory of
//! user-meaningful music file names. The audio itself lives under
//! `MUSIC/` on the device with short, firmware-compatible names.

pub mod check;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod fuse;
pub mod logger;
pub mod paths;
pub mod tags;

pub use check::Checker;
pub use db::Db;
pub use error::{DbError, Result};
pub use fuse::Db5Filesystem;
