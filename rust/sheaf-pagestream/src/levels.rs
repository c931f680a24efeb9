//! Run-length decoder for repetition and definition levels.
//!
//! A level section is a sequence of `(count: u32, level: u16)` runs. An
//! empty section stands for `num_values` implicit zero levels, which is how
//! pages of columns without a given level stream are stored.

use bytes::Bytes;

use sheaf_common::{Error, Result};

/// Size of one encoded level run.
pub const LEVEL_RUN_LEN: usize = 6;

/// Streaming decoder over one level section of a page.
///
/// The decoder hands out exactly `num_values` levels; draining it further
/// reports corruption, as does a section too short to cover `num_values`.
pub struct LevelDecoder {
    buf: Bytes,
    pos: usize,
    run_level: u16,
    run_remaining: usize,
    remaining: usize,
}

impl LevelDecoder {
    pub fn new(buf: Bytes, num_values: usize) -> LevelDecoder {
        let implicit_zeros = buf.is_empty();
        LevelDecoder {
            buf,
            pos: 0,
            run_level: 0,
            run_remaining: if implicit_zeros { num_values } else { 0 },
            remaining: num_values,
        }
    }

    /// Number of levels not yet handed out.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Decodes the next single level.
    pub fn get_next(&mut self) -> Result<u16> {
        if self.run_remaining == 0 {
            self.advance_run()?;
        }
        self.run_remaining -= 1;
        self.remaining -= 1;
        Ok(self.run_level)
    }

    /// Returns the next `(level, count)` with `count` capped at `max`.
    ///
    /// `count` is never zero: an exhausted stream is corruption.
    pub fn get_next_run(&mut self, max: usize) -> Result<(u16, usize)> {
        debug_assert!(max > 0);
        if self.run_remaining == 0 {
            self.advance_run()?;
        }
        let count = self.run_remaining.min(max);
        self.run_remaining -= count;
        self.remaining -= count;
        Ok((self.run_level, count))
    }

    /// Appends the next `count` levels to `out`.
    pub fn get_levels(&mut self, out: &mut Vec<u16>, count: usize) -> Result<()> {
        let mut left = count;
        while left > 0 {
            let (level, n) = self.get_next_run(left)?;
            out.extend(std::iter::repeat_n(level, n));
            left -= n;
        }
        Ok(())
    }

    fn advance_run(&mut self) -> Result<()> {
        while self.run_remaining == 0 {
            if self.remaining == 0 || self.pos + LEVEL_RUN_LEN > self.buf.len() {
                return Err(Error::corruption("level section", "level stream exhausted"));
            }
            let run = &self.buf[self.pos..self.pos + LEVEL_RUN_LEN];
            self.pos += LEVEL_RUN_LEN;
            self.run_remaining = u32::from_le_bytes([run[0], run[1], run[2], run[3]]) as usize;
            self.run_level = u16::from_le_bytes([run[4], run[5]]);
        }
        // A section can promise more levels than the page holds.
        if self.run_remaining > self.remaining {
            return Err(Error::corruption(
                "level section",
                "level run exceeds page value count",
            ));
        }
        Ok(())
    }
}
