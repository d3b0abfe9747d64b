//! Assertions shared by bridge integration suites.

use anyhow::{Result, bail};

use crate::mocks::Interval;

/// Fail if any two recorded call intervals overlap.
///
/// Intervals touching at an instant are not considered overlapping.
///
/// # Errors
///
/// Returns an error naming the first overlapping pair.
pub fn assert_disjoint(intervals: &[Interval]) -> Result<()> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|interval| interval.start);
    for (index, pair) in sorted.windows(2).enumerate() {
        if pair[1].start < pair[0].end {
            bail!(
                "call {} started {:?} before call {} finished",
                index + 1,
                pair[0].end - pair[1].start,
                index
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn span(base: Instant, from_ms: u64, to_ms: u64) -> Interval {
        Interval {
            start: base + Duration::from_millis(from_ms),
            end: base + Duration::from_millis(to_ms),
        }
    }

    #[test]
    fn sequential_intervals_pass_in_any_order() -> Result<()> {
        let base = Instant::now();
        assert_disjoint(&[span(base, 10, 20), span(base, 0, 10), span(base, 25, 30)])
    }

    #[test]
    fn overlapping_intervals_fail() {
        let base = Instant::now();
        assert!(assert_disjoint(&[span(base, 0, 10), span(base, 5, 15)]).is_err());
    }
}
