//! The db5 database layer
//!
//! Four coupled stores kept mutually consistent by [`Db`]: the
//! fixed-record data file ([`dat`]), its header holding the row count
//! ([`hdr`]), the per-column sorted indexes ([`idx`]) and the long-name
//! translation table ([`names`]).

pub mod dat;
pub mod database;
pub mod hdr;
pub mod idx;
pub mod names;
pub mod row;

pub use database::Db;
pub use row::{Row, Source, RECORD_SIZE};
