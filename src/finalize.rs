//! Finalizer: lays out the 256 secondary hash tables and back-patches the
//! primary header. Invoked exactly once, by [`crate::Cdb::close`] on a
//! create-mode handle that has not latched an error.

use crate::builder::BucketAccumulator;
use crate::error::{Error, ErrorKind};
use crate::io::PositionedIo;
use crate::storage::Storage;

/// Result of a successful finalize pass: the primary header entries (in
/// bucket order) the caller should keep as the in-memory header cache, the
/// offset the hash-table section began at, and the final file length.
pub struct FinalizeResult {
    pub header: Vec<(u64, u64)>,
    pub hash_start: u64,
    pub file_end: u64,
}

/// Lay out every non-empty bucket's secondary table, recording an
/// (offset, slot-count) pair for every bucket (including empty ones, whose
/// recorded offset is simply the current tail of the hash-table region),
/// then seek back and write the primary header.
pub fn finalize<S: Storage>(
    io: &mut PositionedIo<S>,
    buckets: &[BucketAccumulator],
    file_start: u64,
) -> Result<FinalizeResult, Error> {
    let word_size = io.word_size();
    let mask = word_size.mask();
    let hash_start = io.position();
    if hash_start > mask {
        return Err(Error::new(ErrorKind::ArithmeticOverflow));
    }

    let mut header = Vec::with_capacity(256);
    let mut scratch_hash: Vec<u64> = Vec::new();
    let mut scratch_pos: Vec<u64> = Vec::new();

    for bucket in buckets {
        let n = bucket.len() as u64;
        if n == 0 {
            header.push((io.position(), 0));
            continue;
        }

        let slots = n
            .checked_mul(2)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        let slots_usize = slots as usize;
        if scratch_hash.len() < slots_usize {
            scratch_hash.resize(slots_usize, 0);
            scratch_pos.resize(slots_usize, 0);
        }
        for slot in scratch_hash[..slots_usize].iter_mut() {
            *slot = 0;
        }
        for slot in scratch_pos[..slots_usize].iter_mut() {
            *slot = 0;
        }

        for &(h, off) in bucket.iter() {
            let start = (h >> 8) % slots;
            let mut k = start as usize;
            while scratch_pos[k] != 0 {
                k = (k + 1) % slots_usize;
            }
            scratch_hash[k] = h;
            scratch_pos[k] = off;
        }

        let table_offset = io.position();
        if table_offset > mask {
            return Err(Error::new(ErrorKind::ArithmeticOverflow));
        }
        header.push((table_offset, slots));
        for k in 0..slots_usize {
            io.write_word_pair(scratch_hash[k], scratch_pos[k])?;
        }
        if io.position() > mask {
            return Err(Error::new(ErrorKind::ArithmeticOverflow));
        }
    }

    let file_end = io.position();
    if file_end > mask {
        return Err(Error::new(ErrorKind::ArithmeticOverflow));
    }
    io.seek(file_start)?;
    for &(off, slots) in &header {
        io.write_word_pair(off, slots)?;
    }
    io.flush()?;

    Ok(FinalizeResult {
        header,
        hash_start,
        file_end,
    })
}
