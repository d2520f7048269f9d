//! Positioned I/O layer: wraps a [`Storage`] adapter, tracks the logical
//! offset, bounds-checks every seek in read mode, and elides redundant seeks
//! (buffered adapters tend to flush internal buffers on every physical
//! seek, so skipping a no-op seek is a measured optimization, not cosmetic).

use crate::error::{Error, ErrorKind};
use crate::storage::Storage;
use crate::word::{pack, unpack, WordSize};

/// Bounds enforced on every seek while the handle is in read mode. `None`
/// while in create mode, where `position` only ever moves forward and the
/// finalizer's single backward seek (to patch the header) is not bounds
/// checked against an upper limit that does not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub file_start: u64,
    pub file_end: u64,
}

pub struct PositionedIo<S: Storage> {
    storage: S,
    /// Logical zero offset added to every physical seek (`CdbConfig::offset`).
    base: u64,
    word_size: WordSize,
    position: u64,
    bounds: Option<Bounds>,
}

impl<S: Storage> PositionedIo<S> {
    /// Construct the layer and immediately synchronize the adapter's
    /// physical cursor to `base + position` — every subsequent `seek` can
    /// then safely elide calls that would be no-ops relative to this point.
    pub fn new(mut storage: S, base: u64, word_size: WordSize, position: u64) -> Result<Self, Error> {
        let physical = base
            .checked_add(position)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        storage
            .seek(physical)
            .map_err(|e| Error::from_storage(ErrorKind::SeekFailed, e))?;
        Ok(PositionedIo {
            storage,
            base,
            word_size,
            position,
            bounds: None,
        })
    }

    pub fn set_bounds(&mut self, bounds: Option<Bounds>) {
        self.bounds = bounds;
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Seek to an absolute logical offset. Elided if it equals the current
    /// position. Bounds-checked against `self.bounds` when set.
    pub fn seek(&mut self, pos: u64) -> Result<(), Error> {
        if let Some(b) = self.bounds {
            if pos < b.file_start || pos > b.file_end {
                return Err(Error::new(ErrorKind::BoundsViolation));
            }
        }
        if pos == self.position {
            return Ok(());
        }
        let physical = self
            .base
            .checked_add(pos)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        self.storage
            .seek(physical)
            .map_err(|e| Error::from_storage(ErrorKind::SeekFailed, e))?;
        self.position = pos;
        Ok(())
    }

    /// Read exactly `buf.len()` bytes, advancing `position`. Any short read
    /// is a hard [`ErrorKind::ReadShort`].
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let n = self
            .storage
            .read(buf)
            .map_err(|e| Error::from_storage(ErrorKind::ReadShort, e))?;
        if n != buf.len() {
            return Err(Error::new(ErrorKind::ReadShort));
        }
        self.advance(buf.len() as u64)?;
        Ok(())
    }

    /// Write all of `buf`, advancing `position`. Any short write is a hard
    /// [`ErrorKind::WriteShort`].
    pub fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let n = self
            .storage
            .write(buf)
            .map_err(|e| Error::from_storage(ErrorKind::WriteShort, e))?;
        if n != buf.len() {
            return Err(Error::new(ErrorKind::WriteShort));
        }
        self.advance(buf.len() as u64)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.storage
            .flush()
            .map_err(|e| Error::from_storage(ErrorKind::Generic, e))
    }

    fn advance(&mut self, n: u64) -> Result<(), Error> {
        self.position = self
            .position
            .checked_add(n)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        Ok(())
    }

    /// Read one word.
    pub fn read_word(&mut self) -> Result<u64, Error> {
        let n = self.word_size.bytes();
        let mut buf = [0u8; 8];
        self.read(&mut buf[..n])?;
        Ok(unpack(&buf[..n], self.word_size))
    }

    /// Read two consecutive words (e.g. `key_len, value_len` or
    /// `slot_hash, record_offset`).
    pub fn read_word_pair(&mut self) -> Result<(u64, u64), Error> {
        let a = self.read_word()?;
        let b = self.read_word()?;
        Ok((a, b))
    }

    /// Write one word.
    pub fn write_word(&mut self, value: u64) -> Result<(), Error> {
        let n = self.word_size.bytes();
        let mut buf = [0u8; 8];
        pack(value, self.word_size, &mut buf[..n]);
        self.write(&buf[..n])
    }

    /// Write two consecutive words.
    pub fn write_word_pair(&mut self, a: u64, b: u64) -> Result<(), Error> {
        self.write_word(a)?;
        self.write_word(b)?;
        Ok(())
    }
}
