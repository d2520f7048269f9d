//! Sequential iteration over the record region, in file insertion order.

use crate::error::{Error, ErrorKind};
use crate::io::PositionedIo;
use crate::storage::Storage;
use crate::word::WordSize;
use crate::FilePos;

/// Iterates `(key_fp, value_fp)` pairs from `file_start + 256*2W` up to
/// `hash_start`, in file order. Holds no data of its own beyond cursor
/// state — every record is read lazily, on demand, through the same
/// [`PositionedIo`] the rest of the handle uses.
pub struct CdbIter<'a, S: Storage> {
    io: &'a mut PositionedIo<S>,
    word_size: WordSize,
    cursor: u64,
    hash_start: u64,
    done: bool,
}

impl<'a, S: Storage> CdbIter<'a, S> {
    pub fn new(io: &'a mut PositionedIo<S>, word_size: WordSize, cursor: u64, hash_start: u64) -> Self {
        CdbIter {
            io,
            word_size,
            cursor,
            hash_start,
            done: false,
        }
    }
}

impl<'a, S: Storage> Iterator for CdbIter<'a, S> {
    type Item = Result<(FilePos, FilePos), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor >= self.hash_start {
            return None;
        }
        let step = || -> Result<(FilePos, FilePos), Error> {
            self.io.seek(self.cursor)?;
            let (k_len, v_len) = self.io.read_word_pair()?;
            let key_pos = self.cursor + self.word_size.slot_bytes();
            let key_end = key_pos
                .checked_add(k_len)
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
            let value_end = key_end
                .checked_add(v_len)
                .ok_or_else(|| Error::new(ErrorKind::ArithmeticOverflow))?;
            if key_end > self.hash_start || value_end > self.hash_start {
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
            self.cursor = value_end;
            Ok((key_fp, value_fp))
        };
        match step() {
            Ok(pair) => Some(Ok(pair)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// What a [`crate::Cdb::foreach`] callback asks the walk to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Stop,
}
