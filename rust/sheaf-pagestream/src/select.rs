//! Batch selection state shared between the reader tree and the page
//! decoders.
//!
//! A `ColumnSelectVector` carries two things across one decode call: the
//! row filter for the current batch (if any), and the run-length null map
//! of the values about to be decoded. The page decoder consumes it as a
//! sequence of uniform runs, each telling it to decode, back-fill nulls,
//! or skip.

use sheaf_column::presence::Presence;

/// What the decoder should do with a run of value slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRunKind {
    /// Decode the next `n` present values.
    Values,
    /// Append `n` null slots; nothing is stored in the value stream.
    Nulls,
    /// The next `n` present values are filtered out: advance the value
    /// stream without materializing.
    FilteredValues,
    /// `n` filtered null slots; nothing to do.
    FilteredNulls,
}

/// Per-batch selection vector.
///
/// The filter map covers the rows of one batch, one byte per row
/// (non-zero keeps the row). `filter_map_index` is the cursor into it;
/// composite readers rewind it with [`reset`](Self::reset) so that every
/// child consumes the same batch window.
#[derive(Default)]
pub struct ColumnSelectVector {
    filter_map: Vec<u8>,
    filter_all: bool,
    has_filter: bool,
    filter_ratio: f64,
    filter_map_index: usize,

    kind_map: Vec<ReadRunKind>,
    runs: Vec<u16>,
    num_values: usize,
    num_nulls: usize,
    num_filtered: usize,
    read_index: usize,
}

impl ColumnSelectVector {
    pub fn new() -> ColumnSelectVector {
        Default::default()
    }

    /// Attaches the batch filter map. A map that rejects nothing is
    /// equivalent to no filter and is dropped.
    pub fn build(&mut self, filter_map: &[u8], filter_all: bool) {
        self.filter_map.clear();
        self.filter_map.extend_from_slice(filter_map);
        self.filter_map_index = 0;
        self.filter_all = filter_all;
        if filter_all {
            self.has_filter = true;
            self.filter_ratio = 1.0;
            return;
        }
        let rejected = filter_map.iter().filter(|&&f| f == 0).count();
        if filter_map.is_empty() || rejected == 0 {
            self.has_filter = false;
            self.filter_ratio = 0.0;
        } else if rejected == filter_map.len() {
            self.has_filter = true;
            self.filter_all = true;
            self.filter_ratio = 1.0;
        } else {
            self.has_filter = true;
            self.filter_ratio = rejected as f64 / filter_map.len() as f64;
        }
    }

    pub fn has_filter(&self) -> bool {
        self.has_filter
    }

    pub fn filter_all(&self) -> bool {
        self.filter_all
    }

    /// Fraction of batch rows the filter rejects; 0 without a filter.
    pub fn filter_ratio(&self) -> f64 {
        if self.has_filter { self.filter_ratio } else { 0.0 }
    }

    /// Whether the next `count` rows of the filter map are all rejected.
    pub fn can_filter_all(&self, count: usize) -> bool {
        if !self.has_filter {
            return false;
        }
        if self.filter_all {
            return true;
        }
        if self.filter_map_index + count > self.filter_map.len() {
            return false;
        }
        self.filter_map[self.filter_map_index..self.filter_map_index + count]
            .iter()
            .all(|&f| f == 0)
    }

    /// Advances the filter cursor past `count` rows without decoding them.
    pub fn skip(&mut self, count: usize) {
        self.filter_map_index += count;
    }

    /// Rewinds the filter cursor to the start of the batch.
    pub fn reset(&mut self) {
        self.filter_map_index = 0;
        self.read_index = 0;
    }

    /// Value slots covered by the pending decode.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Null slots the pending decode will materialize.
    pub fn num_nulls(&self) -> usize {
        self.num_nulls
    }

    /// Slots the filter rejected in the pending decode.
    pub fn num_filtered(&self) -> usize {
        self.num_filtered
    }

    /// Stages the null layout of the next `num_values` value slots.
    ///
    /// `runs` alternate non-null and null counts, starting non-null; zero
    /// counts are permitted as separators. With a filter attached, the
    /// corresponding filter-map rows are consumed and rejected slots turn
    /// into `Filtered*` runs. Presence flags for the surviving slots are
    /// appended to `presence` when given.
    pub fn set_run_length_null_map(
        &mut self,
        runs: &[u16],
        num_values: usize,
        presence: Option<&mut Presence>,
    ) {
        debug_assert_eq!(
            runs.iter().map(|&r| r as usize).sum::<usize>(),
            num_values,
            "null-map runs must cover the value count"
        );
        self.num_values = num_values;
        self.num_nulls = 0;
        self.num_filtered = 0;
        self.read_index = 0;
        if self.has_filter {
            self.stage_filtered(runs, num_values, presence);
        } else {
            self.runs.clear();
            self.runs.extend_from_slice(runs);
            if let Some(presence) = presence {
                let mut is_null = false;
                for &run in runs {
                    let run = run as usize;
                    if is_null {
                        self.num_nulls += run;
                        presence.extend_with_nulls(run);
                    } else {
                        presence.extend_with_non_nulls(run);
                    }
                    is_null = !is_null;
                }
            } else {
                let mut is_null = false;
                for &run in runs {
                    if is_null {
                        self.num_nulls += run as usize;
                    }
                    is_null = !is_null;
                }
            }
        }
    }

    fn stage_filtered(
        &mut self,
        runs: &[u16],
        num_values: usize,
        presence: Option<&mut Presence>,
    ) {
        debug_assert!(
            self.filter_map_index + num_values <= self.filter_map.len(),
            "filter map does not cover the batch"
        );
        self.kind_map.clear();
        self.kind_map.reserve(num_values);
        let mut is_null = false;
        for &run in runs {
            let kind = if is_null {
                ReadRunKind::Nulls
            } else {
                ReadRunKind::Values
            };
            self.kind_map
                .extend(std::iter::repeat_n(kind, run as usize));
            is_null = !is_null;
        }
        let filter = &self.filter_map[self.filter_map_index..self.filter_map_index + num_values];
        self.filter_map_index += num_values;
        for (slot, &keep) in self.kind_map.iter_mut().zip(filter) {
            if keep == 0 {
                self.num_filtered += 1;
                *slot = match slot {
                    ReadRunKind::Values => ReadRunKind::FilteredValues,
                    _ => ReadRunKind::FilteredNulls,
                };
            } else if *slot == ReadRunKind::Nulls {
                self.num_nulls += 1;
            }
        }
        if let Some(presence) = presence {
            for slot in &self.kind_map {
                match slot {
                    ReadRunKind::Values => presence.push_non_null(),
                    ReadRunKind::Nulls => presence.push_null(),
                    _ => {}
                }
            }
        }
    }

    /// Returns the next uniform run of the staged null map, or `None` when
    /// the staged `num_values` are consumed.
    pub fn get_next_run(&mut self) -> Option<(ReadRunKind, usize)> {
        if self.has_filter {
            if self.read_index == self.kind_map.len() {
                return None;
            }
            let kind = self.kind_map[self.read_index];
            let start = self.read_index;
            self.read_index += 1;
            while self.read_index < self.kind_map.len() && self.kind_map[self.read_index] == kind {
                self.read_index += 1;
            }
            Some((kind, self.read_index - start))
        } else {
            while self.read_index < self.runs.len() {
                let index = self.read_index;
                self.read_index += 1;
                let run = self.runs[index] as usize;
                if run > 0 {
                    let kind = if index % 2 == 0 {
                        ReadRunKind::Values
                    } else {
                        ReadRunKind::Nulls
                    };
                    return Some((kind, run));
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use sheaf_column::presence::Presence;

    use super::{ColumnSelectVector, ReadRunKind};

    fn drain(select: &mut ColumnSelectVector) -> Vec<(ReadRunKind, usize)> {
        std::iter::from_fn(|| select.get_next_run()).collect()
    }

    #[test]
    fn test_unfiltered_runs() {
        let mut select = ColumnSelectVector::new();
        let mut presence = Presence::new();
        // 1 non-null, 1 null, 2 non-null, 1 null.
        select.set_run_length_null_map(&[1, 1, 2, 1], 5, Some(&mut presence));
        assert_eq!(select.num_values(), 5);
        assert_eq!(select.num_nulls(), 2);
        assert_eq!(select.num_filtered(), 0);
        assert_eq!(presence.len(), 5);
        assert!(presence.is_null(1) && presence.is_null(4));
        assert_eq!(
            drain(&mut select),
            [
                (ReadRunKind::Values, 1),
                (ReadRunKind::Nulls, 1),
                (ReadRunKind::Values, 2),
                (ReadRunKind::Nulls, 1),
            ]
        );
    }

    #[test]
    fn test_zero_separators_merge_parity() {
        let mut select = ColumnSelectVector::new();
        // Two adjacent non-null runs joined by a zero-length null separator.
        select.set_run_length_null_map(&[3, 0, 2, 1], 6, None);
        assert_eq!(select.num_nulls(), 1);
        assert_eq!(
            drain(&mut select),
            [
                (ReadRunKind::Values, 3),
                (ReadRunKind::Values, 2),
                (ReadRunKind::Nulls, 1),
            ]
        );
    }

    #[test]
    fn test_filtered_runs_and_presence() {
        let mut select = ColumnSelectVector::new();
        select.build(&[1, 0, 0, 1, 1], false);
        assert!(select.has_filter());
        assert_eq!(select.filter_ratio(), 0.4);

        let mut presence = Presence::new();
        // Slots: V N V V N; filter keeps slots 0, 3, 4.
        select.set_run_length_null_map(&[1, 1, 2, 1], 5, Some(&mut presence));
        assert_eq!(select.num_filtered(), 2);
        assert_eq!(select.num_nulls(), 1);
        assert_eq!(presence.len(), 3);
        assert!(!presence.is_null(0) && !presence.is_null(1) && presence.is_null(2));
        assert_eq!(
            drain(&mut select),
            [
                (ReadRunKind::Values, 1),
                (ReadRunKind::FilteredNulls, 1),
                (ReadRunKind::FilteredValues, 1),
                (ReadRunKind::Values, 1),
                (ReadRunKind::Nulls, 1),
            ]
        );
    }

    #[test]
    fn test_filter_cursor_skip_and_reset() {
        let mut select = ColumnSelectVector::new();
        select.build(&[0, 0, 1, 0], false);
        assert!(select.can_filter_all(2));
        assert!(!select.can_filter_all(3));
        select.skip(2);
        assert!(!select.can_filter_all(1));
        select.reset();
        assert!(select.can_filter_all(2));
        assert!(!select.can_filter_all(5));
    }

    #[test]
    fn test_all_kept_filter_is_dropped() {
        let mut select = ColumnSelectVector::new();
        select.build(&[1, 1, 1], false);
        assert!(!select.has_filter());
        assert_eq!(select.filter_ratio(), 0.0);
    }

    #[test]
    fn test_all_rejected_filter_becomes_filter_all() {
        let mut select = ColumnSelectVector::new();
        select.build(&[0, 0], false);
        assert!(select.filter_all());
        assert!(select.can_filter_all(1000));
        select.set_run_length_null_map(&[2, 0], 2, None);
        assert_eq!(
            drain(&mut select),
            [(ReadRunKind::FilteredValues, 2)]
        );
        assert_eq!(select.num_filtered(), 2);
    }
}
