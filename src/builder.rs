//! Writer / builder: accumulates per-bucket `(hash, record_offset)` pairs as
//! records are appended, so the finalizer can lay out the 256 secondary hash
//! tables in one pass over in-memory data.

/// One of the 256 primary buckets' accumulated `(hash, record_offset)`
/// pairs, in insertion order. A plain growable vector — the "two pointer
/// arrays" split mentioned for finalize-time cache layout is an
/// implementation detail of [`crate::finalize`], not of accumulation.
#[derive(Debug, Default)]
pub struct BucketAccumulator {
    entries: Vec<(u64, u64)>,
}

impl BucketAccumulator {
    pub fn new() -> Self {
        BucketAccumulator {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, hash: u64, record_offset: u64) {
        self.entries.push((hash, record_offset));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(u64, u64)> {
        self.entries.iter()
    }
}

/// 256 bucket accumulators, one per primary-table index.
pub fn new_buckets() -> Vec<BucketAccumulator> {
    (0..256).map(|_| BucketAccumulator::new()).collect()
}
