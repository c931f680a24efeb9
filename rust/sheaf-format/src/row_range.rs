//! Row-range selection.

use sheaf_common::{Result, verify_arg};

/// A half-open range of top-level row positions within a row group,
/// `first_row..last_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first_row: u64,
    pub last_row: u64,
}

impl RowRange {
    pub fn new(first_row: u64, last_row: u64) -> RowRange {
        RowRange {
            first_row,
            last_row,
        }
    }

    pub fn row_count(&self) -> u64 {
        self.last_row - self.first_row
    }

    pub fn is_empty(&self) -> bool {
        self.first_row >= self.last_row
    }
}

impl From<std::ops::Range<u64>> for RowRange {
    fn from(range: std::ops::Range<u64>) -> RowRange {
        RowRange::new(range.start, range.end)
    }
}

/// Verifies that the ranges are non-empty, sorted ascending and
/// non-overlapping.
pub fn validate_row_ranges(ranges: &[RowRange]) -> Result<()> {
    for (i, range) in ranges.iter().enumerate() {
        verify_arg!(row_ranges, range.first_row < range.last_row);
        if i > 0 {
            verify_arg!(row_ranges, ranges[i - 1].last_row <= range.first_row);
        }
    }
    Ok(())
}

/// Total number of rows selected by the ranges.
pub fn total_selected(ranges: &[RowRange]) -> u64 {
    ranges.iter().map(RowRange::row_count).sum()
}
