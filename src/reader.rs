//! Reader / lookup: hash -> bucket -> secondary-table probe -> key compare
//! -> value position.

use crate::config::CdbConfig;
use crate::error::{Error, ErrorKind};
use crate::hash::{bucket_of, probe_start};
use crate::io::PositionedIo;
use crate::storage::Storage;
use crate::FilePos;

/// Outcome of a probe: the first (or `record_index`-th) matching record's
/// position, if any, plus the number of matches observed along the way —
/// `count()` is just this probe run to completion while ignoring `found`.
pub struct LookupOutcome {
    pub found: Option<FilePos>,
    pub match_count: u64,
}

/// Fetch bucket `bucket`'s `(table_offset, slots)` either from the cached
/// header or, if no cache is kept, by reading it directly off disk.
fn bucket_entry<S: Storage>(
    io: &mut PositionedIo<S>,
    header_cache: Option<&[(u64, u64)]>,
    file_start: u64,
    bucket: usize,
) -> Result<(u64, u64), Error> {
    if let Some(cache) = header_cache {
        return Ok(cache[bucket]);
    }
    let word_size = io.word_size();
    let entry_off = file_start
        .checked_add(bucket as u64 * word_size.header_entry_bytes())
        .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
    io.seek(entry_off)?;
    io.read_word_pair()
}

/// Probe for `key`, stopping at the `target`-th match (`None` means: run to
/// completion and just report the match count, as `count()` does).
#[allow(clippy::too_many_arguments)]
pub fn lookup<S: Storage>(
    io: &mut PositionedIo<S>,
    header_cache: Option<&[(u64, u64)]>,
    file_start: u64,
    hash_start: u64,
    file_end: u64,
    config: &CdbConfig,
    key: &[u8],
    target: Option<u64>,
) -> Result<LookupOutcome, Error> {
    let word_size = config.word_size;
    let slot_bytes = word_size.slot_bytes();

    let h = config.hash(key);
    let bucket = bucket_of(h);

    let (table_off, slots) = bucket_entry(io, header_cache, file_start, bucket)?;
    if slots == 0 {
        return Ok(LookupOutcome {
            found: None,
            match_count: 0,
        });
    }
    if table_off < hash_start || table_off > file_end {
        return Err(Error::new(ErrorKind::BoundsViolation));
    }

    let start = probe_start(h, slots);
    let mut match_count: u64 = 0;
    let mut probe_buf = vec![0u8; config.probe_buffer_size.max(1)];

    for i in 0..slots {
        let slot_index = (start + i) % slots;
        let slot_off = table_off
            .checked_add(slot_index.checked_mul(slot_bytes).ok_or_else(|| {
                Error::new(ErrorKind::ArithmeticOverflow)
            })?)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        if slot_off < table_off || slot_off > file_end {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }

        io.seek(slot_off)?;
        let (slot_hash, rec_off) = io.read_word_pair()?;

        if rec_off == 0 {
            return Ok(LookupOutcome {
                found: None,
                match_count,
            });
        }
        if bucket_of(slot_hash) != bucket {
            return Err(Error::new(ErrorKind::HashInvariant));
        }
        if slot_hash != h {
            continue;
        }

        if rec_off >= hash_start {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }
        io.seek(rec_off)?;
        let (k_len, v_len) = io.read_word_pair()?;
        let key_end = rec_off
            .checked_add(word_size.slot_bytes())
            .and_then(|p| p.checked_add(k_len))
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        let record_end = key_end
            .checked_add(v_len)
            .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
        if key_end > hash_start || record_end > hash_start {
            return Err(Error::new(ErrorKind::BoundsViolation));
        }

        if keys_match(io, key, k_len, config, &mut probe_buf)? {
            let matched = target == Some(match_count);
            if matched {
                return Ok(LookupOutcome {
                    found: Some(FilePos {
                        position: key_end,
                        length: v_len,
                    }),
                    match_count,
                });
            }
            match_count += 1;
        }
    }

    Ok(LookupOutcome {
        found: None,
        match_count,
    })
}

/// Compare the stored key (`k_len` bytes, already positioned right after the
/// length pair) against `key`, in fixed-size chunks so peak memory use is
/// bounded regardless of key length. The caller always re-seeks before its
/// next read, so the cursor's position on return is unspecified.
fn keys_match<S: Storage>(
    io: &mut PositionedIo<S>,
    key: &[u8],
    k_len: u64,
    config: &CdbConfig,
    buf: &mut [u8],
) -> Result<bool, Error> {
    if k_len != key.len() as u64 {
        // Every call site re-seeks to the next slot before its next read, so
        // there is no need to consume the stored key bytes here.
        return Ok(false);
    }
    let mut remaining = key;
    let mut matches = true;
    let mut left = k_len;
    while left > 0 {
        let chunk = (left as usize).min(buf.len());
        io.read(&mut buf[..chunk])?;
        if matches {
            let (want, rest) = remaining.split_at(chunk);
            if !config.compare(&buf[..chunk], want) {
                matches = false;
            }
            remaining = rest;
        }
        left -= chunk as u64;
    }
    Ok(matches)
}
