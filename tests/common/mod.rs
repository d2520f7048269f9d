//! Test-only support: an in-memory [`cdb::Storage`] adapter and a
//! deterministic PRNG, used by this crate's own end-to-end tests. Neither is
//! part of the public API — production storage backends are an external
//! collaborator's job (see `spec.md` §1).

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use cdb::Storage;

/// A `Vec<u8>`-backed [`Storage`] adapter. The backing buffer is reference
/// counted so a test can open fresh cursors over the same bytes — standing
/// in for closing a file and reopening it by name.
pub struct MemoryStorage {
    buf: Rc<RefCell<Vec<u8>>>,
    pos: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            buf: Rc::new(RefCell::new(Vec::new())),
            pos: 0,
        }
    }

    pub fn from_vec(v: Vec<u8>) -> Self {
        MemoryStorage {
            buf: Rc::new(RefCell::new(v)),
            pos: 0,
        }
    }

    /// A fresh cursor (position 0) over the same backing bytes — "reopen".
    pub fn handle(&self) -> MemoryStorage {
        MemoryStorage {
            buf: self.buf.clone(),
            pos: 0,
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// Corrupt the backing buffer by dropping its last byte, for S4-style
    /// truncation tests.
    pub fn truncate_last_byte(&self) {
        self.buf.borrow_mut().pop();
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    type Error = std::io::Error;

    fn read(&mut self, out: &mut [u8]) -> Result<usize, Self::Error> {
        let b = self.buf.borrow();
        let avail = b.len().saturating_sub(self.pos);
        let n = avail.min(out.len());
        out[..n].copy_from_slice(&b[self.pos..self.pos + n]);
        drop(b);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut b = self.buf.borrow_mut();
        if self.pos + data.len() > b.len() {
            b.resize(self.pos + data.len(), 0);
        }
        b[self.pos..self.pos + data.len()].copy_from_slice(data);
        drop(b);
        self.pos += data.len();
        Ok(data.len())
    }

    fn seek(&mut self, absolute_offset: u64) -> Result<(), Self::Error> {
        self.pos = absolute_offset as usize;
        Ok(())
    }
}

/// xorshift128+: a small, fast, fully deterministic PRNG used only to
/// generate the random (key, value) pairs in the large-scale round-trip
/// test (spec.md §8 S5). Not cryptographically secure and not meant to be.
pub struct Xorshift128 {
    x: u64,
    y: u64,
}

impl Xorshift128 {
    pub fn new(seed: (u64, u64)) -> Self {
        Xorshift128 {
            x: seed.0,
            y: seed.1,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.x;
        let y = self.y;
        self.x = y;
        x ^= x << 23;
        x ^= x >> 17;
        x ^= y ^ (y >> 26);
        self.y = x;
        x.wrapping_add(y)
    }

    /// Uniform-enough value in `[lo, hi]` inclusive, for test data sizing.
    pub fn next_range(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(hi >= lo);
        let span = hi - lo + 1;
        lo + self.next_u64() % span
    }

    pub fn next_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            out.extend_from_slice(&self.next_u64().to_le_bytes());
        }
        out.truncate(len);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prng_is_deterministic() {
        let mut a = Xorshift128::new((1, 0));
        let mut b = Xorshift128::new((1, 0));
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn handle_shares_backing_bytes() {
        let storage = MemoryStorage::new();
        {
            let mut w = storage.handle();
            use cdb::Storage as _;
            w.write(b"abc").unwrap();
        }
        assert_eq!(storage.snapshot(), b"abc");
    }
}
