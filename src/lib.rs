//! A constant key-value database — a Rust port of [howerj/cdb], itself
//! compatible with D. J. Bernstein's CDB format.
//!
//! A database is built in a single pass ([`Cdb::create`] + repeated
//! [`Cdb::add`]), finalized by [`Cdb::close`] (which emits the 256
//! secondary hash tables and back-patches the primary header), and from then
//! on is read-only ([`Cdb::open`]) with O(1) lookup of values by key,
//! including duplicate keys (multiple values per key, disambiguated by
//! insertion-order `record_index`).
//!
//! The crate ships the on-disk format and the two-level hashing scheme only.
//! Callers supply the byte store through the [`Storage`] trait — there is no
//! bundled file adapter, CLI, or dump/query tool.
//!
//! [howerj/cdb]: https://github.com/howerj/cdb
//!
//! # Example
//!
//! ```
//! use cdb::{Cdb, CdbConfig, Storage};
//! use std::io::Cursor;
//!
//! struct CursorStorage(Cursor<Vec<u8>>);
//! impl Storage for CursorStorage {
//!     type Error = std::io::Error;
//!     fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
//!         std::io::Read::read(&mut self.0, buf)
//!     }
//!     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
//!         std::io::Write::write(&mut self.0, buf)
//!     }
//!     fn seek(&mut self, absolute_offset: u64) -> Result<(), Self::Error> {
//!         std::io::Seek::seek(&mut self.0, std::io::SeekFrom::Start(absolute_offset))?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = Cdb::create(CursorStorage(Cursor::new(Vec::new())), CdbConfig::default())?;
//! writer.add(b"hello", b"world")?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
mod finalize;
mod hash;
mod handle;
mod io;
mod iter;
mod reader;
mod storage;
mod word;

pub use config::{CdbConfig, CompareFn, HashFn};
pub use error::{Error, ErrorKind, Result};
pub use handle::{Cdb, RecordReader};
pub use iter::{CdbIter, ControlFlow};
pub use storage::Storage;
pub use word::WordSize;

/// A position and length describing a byte range within the database file —
/// a key or a value, located but not yet read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePos {
    pub position: u64,
    pub length: u64,
}
