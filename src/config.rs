//! Open-time configuration.
//!
//! Gathers the knobs the reference C API threads through
//! `cdb_file_operators_t`/`cdb_allocator_t` at `cdb_open`: the word size, the
//! optional hash/compare overrides, the logical base `offset` that lets a
//! database be embedded inside a larger file, whether to cache the primary
//! header in memory, and the fixed-size buffer used when comparing probed
//! keys byte-for-byte.

use crate::word::WordSize;

/// A key/value byte-comparison override. Defaults to byte-wise equality.
pub type CompareFn = fn(&[u8], &[u8]) -> bool;

/// A hash override. Defaults to the crate's DJB-variant [`crate::hash::hash`].
pub type HashFn = fn(&[u8], WordSize) -> u64;

/// Configuration passed to [`crate::Cdb::open`]/[`crate::Cdb::create`].
#[derive(Debug, Clone)]
pub struct CdbConfig {
    /// On-disk integer width. Default 32 bits, the canonical DJB CDB width.
    pub word_size: WordSize,
    /// Logical zero offset added to every seek, so the database can live
    /// inside a larger file.
    pub offset: u64,
    /// Keep an in-memory copy of the 256-entry primary header to avoid one
    /// seek+read per lookup. Lookups behave identically either way.
    pub cache_header: bool,
    /// Fixed-size buffer used when comparing a probed key against the
    /// lookup key, in chunks, to bound peak memory use for arbitrarily long
    /// keys. Default 256 bytes.
    pub probe_buffer_size: usize,
    /// Optional hash override; `None` uses the built-in DJB variant.
    pub hash_fn: Option<HashFn>,
    /// Optional key/value comparison override; `None` uses byte equality.
    pub compare_fn: Option<CompareFn>,
}

impl Default for CdbConfig {
    fn default() -> Self {
        CdbConfig {
            word_size: WordSize::W32,
            offset: 0,
            cache_header: true,
            probe_buffer_size: 256,
            hash_fn: None,
            compare_fn: None,
        }
    }
}

impl CdbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn word_size(mut self, word_size: WordSize) -> Self {
        self.word_size = word_size;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn cache_header(mut self, cache: bool) -> Self {
        self.cache_header = cache;
        self
    }

    pub fn probe_buffer_size(mut self, size: usize) -> Self {
        self.probe_buffer_size = size.max(1);
        self
    }

    pub fn hash_fn(mut self, f: HashFn) -> Self {
        self.hash_fn = Some(f);
        self
    }

    pub fn compare_fn(mut self, f: CompareFn) -> Self {
        self.compare_fn = Some(f);
        self
    }

    pub(crate) fn hash(&self, bytes: &[u8]) -> u64 {
        match self.hash_fn {
            Some(f) => f(bytes, self.word_size),
            None => crate::hash::hash(bytes, self.word_size),
        }
    }

    pub(crate) fn compare(&self, a: &[u8], b: &[u8]) -> bool {
        match self.compare_fn {
            Some(f) => f(a, b),
            None => a == b,
        }
    }
}
