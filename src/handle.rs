//! Handle / state machine: the single mutable object the core exposes.
//!
//! A [`Cdb`] is opened in exactly one of two modes (read or create), mutated
//! only through the operations below, and destroyed by [`Cdb::close`] (or,
//! failing an explicit call, by `Drop`, which cannot surface a finalize
//! failure and so only logs one). Any internal failure latches the handle:
//! every subsequent operation fails fast with the latched kind until the
//! handle is closed.

use std::cell::Cell;

use crate::builder::{new_buckets, BucketAccumulator};
use crate::config::CdbConfig;
use crate::error::{Error, ErrorKind};
use crate::hash::bucket_of;
use crate::io::{Bounds, PositionedIo};
use crate::iter::{CdbIter, ControlFlow};
use crate::reader;
use crate::storage::Storage;
use crate::FilePos;

/// Which of the two terminal states (spec.md §4.8's `Read`/`Create`) a
/// handle is in. There is no Rust value for the transient `Opening` state:
/// `Cdb::open`/`Cdb::create` either succeed and return a handle in one of
/// these two states, or fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Create,
}

/// A scoped view over the handle's storage that a [`Cdb::foreach`] callback
/// can use to fetch the bytes behind a [`FilePos`], without needing the rest
/// of `Cdb`'s state (which the callback is already mid-borrow of).
pub struct RecordReader<'a, S: Storage> {
    io: &'a mut PositionedIo<S>,
}

impl<'a, S: Storage> RecordReader<'a, S> {
    /// Read exactly `fp.length` bytes at `fp.position` into `buf`.
    /// `buf.len()` must equal `fp.length`.
    pub fn read_at(&mut self, fp: FilePos, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() as u64 != fp.length {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }
        self.io.seek(fp.position)?;
        self.io.read(buf)
    }
}

/// An open constant database. Generic over the injected [`Storage`] adapter.
pub struct Cdb<S: Storage> {
    io: PositionedIo<S>,
    config: CdbConfig,
    mode: Mode,
    latched: Cell<Option<ErrorKind>>,
    file_start: u64,
    file_end: u64,
    hash_start: u64,
    header_cache: Option<Vec<(u64, u64)>>,
    buckets: Option<Vec<BucketAccumulator>>,
    closed: bool,
}

impl<S: Storage> Cdb<S> {
    /// Open an existing database for reading.
    ///
    /// Reads the 256-entry primary header, derives `hash_start` as the
    /// minimum table offset among non-empty buckets (or the end of the
    /// header if every bucket is empty) and `file_end` as the maximum
    /// `table_offset + slots * slot_bytes`, then validates that the
    /// non-empty tables are densely packed and contiguous starting at
    /// `hash_start` — a corrupt or foreign file that violates denseness is
    /// rejected here rather than silently mis-deriving `hash_start`.
    pub fn open(storage: S, config: CdbConfig) -> Result<Self, Error> {
        let word_size = config.word_size;
        let mut io = PositionedIo::new(storage, config.offset, word_size, 0)?;

        let mut header = Vec::with_capacity(256);
        for _ in 0..256 {
            header.push(io.read_word_pair()?);
        }

        let header_end = word_size.header_bytes();
        let nonempty: Vec<(u64, u64)> = header.iter().copied().filter(|&(_, n)| n > 0).collect();

        let hash_start = if nonempty.is_empty() {
            header_end
        } else {
            nonempty.iter().map(|&(off, _)| off).min().unwrap()
        };
        let file_end = if nonempty.is_empty() {
            hash_start
        } else {
            let mut max_end: Option<u64> = None;
            for &(off, n) in &nonempty {
                let table_bytes = n
                    .checked_mul(word_size.slot_bytes())
                    .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
                let end = off
                    .checked_add(table_bytes)
                    .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
                max_end = Some(max_end.map_or(end, |m| m.max(end)));
            }
            max_end.unwrap()
        };

        if hash_start < header_end || hash_start > file_end {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }
        for &(off, n) in &header {
            if off < header_end || (n > 0 && off < hash_start) {
                return Err(Error::new(ErrorKind::BoundsViolation));
            }
        }

        let mut sorted = nonempty;
        sorted.sort_by_key(|&(off, _)| off);
        let mut expected = hash_start;
        for &(off, n) in &sorted {
            if off != expected {
                return Err(Error::new(ErrorKind::BoundsViolation));
            }
            let table_bytes = n
                .checked_mul(word_size.slot_bytes())
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
            expected = off
                .checked_add(table_bytes)
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        }
        if expected != file_end {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }

        io.set_bounds(Some(Bounds {
            file_start: 0,
            file_end,
        }));

        let header_cache = if config.cache_header {
            Some(header)
        } else {
            None
        };

        log::debug!(
            "opened cdb for reading: hash_start={hash_start} file_end={file_end} cached_header={}",
            header_cache.is_some()
        );

        Ok(Cdb {
            io,
            config,
            mode: Mode::Read,
            latched: Cell::new(None),
            file_start: 0,
            file_end,
            hash_start,
            header_cache,
            buckets: None,
            closed: false,
        })
    }

    /// Begin building a new database. Writes 256 zero placeholder pairs as
    /// the header, to be back-patched by [`Cdb::close`]'s finalize pass.
    pub fn create(storage: S, config: CdbConfig) -> Result<Self, Error> {
        let word_size = config.word_size;
        let mut io = PositionedIo::new(storage, config.offset, word_size, 0)?;
        for _ in 0..256 {
            io.write_word_pair(0, 0)?;
        }
        log::debug!("opened cdb for creation, word_size={:?}", word_size);
        Ok(Cdb {
            io,
            config,
            mode: Mode::Create,
            latched: Cell::new(None),
            file_start: 0,
            file_end: 0,
            hash_start: 0,
            header_cache: None,
            buckets: Some(new_buckets()),
            closed: false,
        })
    }

    /// The handle's latched error, if any.
    pub fn error(&self) -> Option<ErrorKind> {
        self.latched.get()
    }

    fn check_latch(&self) -> Result<(), Error> {
        match self.latched.get() {
            Some(k) => Err(Error::new(k)),
            None => Ok(()),
        }
    }

    fn latch(&self, kind: ErrorKind) -> Error {
        self.latched.set(Some(kind));
        Error::new(kind)
    }

    fn latch_err(&self, e: Error) -> Error {
        self.latched.set(Some(e.kind()));
        e
    }

    /// Append a record. Only valid on a create-mode handle; duplicates are
    /// permitted (no equality check against prior records — the lookup
    /// layer disambiguates occurrences by `record_index`).
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.check_latch()?;
        if self.mode != Mode::Create {
            return Err(self.latch(ErrorKind::ModeMismatch));
        }
        self.add_inner(key, value).map_err(|e| self.latch_err(e))
    }

    fn add_inner(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let word_mask = self.config.word_size.mask();
        let key_len = key.len() as u64;
        let value_len = value.len() as u64;
        if key_len > word_mask || value_len > word_mask {
            return Err(Error::new(ErrorKind::ArithmeticOverflow));
        }
        key_len
            .checked_add(value_len)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;

        let position = self.io.position();
        if position > word_mask {
            return Err(Error::new(ErrorKind::ArithmeticOverflow));
        }
        let slot_bytes = self.config.word_size.slot_bytes();
        let needed = slot_bytes
            .checked_add(key_len)
            .and_then(|v| v.checked_add(value_len))
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        let next_position = position
            .checked_add(needed)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        if next_position > word_mask {
            return Err(Error::new(ErrorKind::ArithmeticOverflow));
        }

        let h = self.config.hash(key);
        let bucket = bucket_of(h);
        self.buckets.as_mut().expect("create mode has buckets")[bucket].push(h, position);

        self.io.seek(position)?;
        self.io.write_word_pair(key_len, value_len)?;
        self.io.write(key)?;
        self.io.write(value)?;
        log::trace!("add: bucket={bucket} position={position} key_len={key_len} value_len={value_len}");
        Ok(())
    }

    /// `lookup(key, 0)`.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<FilePos>, Error> {
        self.lookup(key, 0)
    }

    /// The `record_index`-th (0-based, in insertion order) value stored
    /// under `key`, if present.
    pub fn lookup(&mut self, key: &[u8], record_index: u64) -> Result<Option<FilePos>, Error> {
        self.check_latch()?;
        if self.mode != Mode::Read {
            return Err(self.latch(ErrorKind::ModeMismatch));
        }
        match reader::lookup(
            &mut self.io,
            self.header_cache.as_deref(),
            self.file_start,
            self.hash_start,
            self.file_end,
            &self.config,
            key,
            Some(record_index),
        ) {
            Ok(outcome) => Ok(outcome.found),
            Err(e) => Err(self.latch_err(e)),
        }
    }

    /// Number of values stored under `key`.
    pub fn count(&mut self, key: &[u8]) -> Result<u64, Error> {
        self.check_latch()?;
        if self.mode != Mode::Read {
            return Err(self.latch(ErrorKind::ModeMismatch));
        }
        match reader::lookup(
            &mut self.io,
            self.header_cache.as_deref(),
            self.file_start,
            self.hash_start,
            self.file_end,
            &self.config,
            key,
            None,
        ) {
            Ok(outcome) => Ok(outcome.match_count),
            Err(e) => Err(self.latch_err(e)),
        }
    }

    /// Read the bytes a [`FilePos`] describes (the opaque seek/read
    /// operation from the core's operation table). `buf.len()` must equal
    /// `fp.length`.
    pub fn read_at(&mut self, fp: FilePos, buf: &mut [u8]) -> Result<(), Error> {
        self.check_latch()?;
        let result = (|| {
            if buf.len() as u64 != fp.length {
                return Err(Error::new(ErrorKind::BoundsViolation));
            }
            self.io.seek(fp.position)?;
            self.io.read(buf)
        })();
        result.map_err(|e| self.latch_err(e))
    }

    /// Convenience wrapper returning the value's bytes directly.
    pub fn get_value(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match self.get(key)? {
            Some(fp) => {
                let mut buf = vec![0u8; fp.length as usize];
                self.read_at(fp, &mut buf)?;
                Ok(Some(buf))
            }
            None => Ok(None),
        }
    }

    /// Iterate `(key_fp, value_fp)` in file insertion order. Only valid on a
    /// read-mode, non-latched handle.
    pub fn iter(&mut self) -> Result<CdbIter<'_, S>, Error> {
        self.check_latch()?;
        if self.mode != Mode::Read {
            return Err(self.latch(ErrorKind::ModeMismatch));
        }
        let word_size = self.config.word_size;
        let cursor = self.file_start + word_size.header_bytes();
        Ok(CdbIter::new(&mut self.io, word_size, cursor, self.hash_start))
    }

    /// Walk every record in file order, calling `f` with a scoped reader and
    /// the record's key/value positions. `f` returning [`ControlFlow::Stop`]
    /// ends the walk early without error.
    pub fn foreach<F>(&mut self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut RecordReader<'_, S>, FilePos, FilePos) -> Result<ControlFlow, Error>,
    {
        self.check_latch()?;
        if self.mode != Mode::Read {
            return Err(self.latch(ErrorKind::ModeMismatch));
        }
        let result = self.foreach_inner(&mut f);
        result.map_err(|e| self.latch_err(e))
    }

    fn foreach_inner<F>(&mut self, f: &mut F) -> Result<(), Error>
    where
        F: FnMut(&mut RecordReader<'_, S>, FilePos, FilePos) -> Result<ControlFlow, Error>,
    {
        let word_size = self.config.word_size;
        let mut cursor = self.file_start + word_size.header_bytes();
        let hash_start = self.hash_start;

        while cursor < hash_start {
            self.io.seek(cursor)?;
            let (k_len, v_len) = self.io.read_word_pair()?;
            let key_pos = cursor + word_size.slot_bytes();
            let key_end = key_pos
                .checked_add(k_len)
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
            let value_end = key_end
                .checked_add(v_len)
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
            if key_end > hash_start || value_end > hash_start {
                return Err(Error::new(ErrorKind::BoundsViolation));
            }
            let key_fp = FilePos {
                position: key_pos,
                length: k_len,
            };
            let value_fp = FilePos {
                position: key_end,
                length: v_len,
            };
            let mut reader = RecordReader { io: &mut self.io };
            match f(&mut reader, key_fp, value_fp)? {
                ControlFlow::Continue => {}
                ControlFlow::Stop => break,
            }
            cursor = value_end;
        }
        Ok(())
    }

    /// Finalize (create mode) and release the handle. Always returns the
    /// aggregate status, including a previously-latched error.
    pub fn close(mut self) -> Result<(), Error> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(k) = self.latched.get() {
            return Err(Error::new(k));
        }

        if self.mode == Mode::Create {
            let buckets = self.buckets.take().expect("create mode has buckets");
            return match crate::finalize::finalize(&mut self.io, &buckets, self.file_start) {
                Ok(result) => {
                    log::debug!(
                        "finalized cdb: hash_start={} file_end={}",
                        result.hash_start,
                        result.file_end
                    );
                    self.hash_start = result.hash_start;
                    self.file_end = result.file_end;
                    if self.config.cache_header {
                        self.header_cache = Some(result.header);
                    }
                    Ok(())
                }
                Err(e) => {
                    self.latched.set(Some(e.kind()));
                    Err(e)
                }
            };
        }
        Ok(())
    }
}

impl<S: Storage> Drop for Cdb<S> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close_inner() {
                log::error!("cdb handle dropped without an explicit close(); finalize failed: {e}");
            }
        }
    }
}
