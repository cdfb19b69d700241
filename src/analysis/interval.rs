//! Nominal probe-interval estimation.

use chrono::{DateTime, Utc};

use super::stats::{delta_secs, mean, median};

/// Interval assumed when a session has no measurable spacing at all
/// (empty input, a single sample, or nothing but duplicate timestamps).
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Estimate the nominal sampling interval of a session, in seconds.
///
/// Median of the positive deltas between consecutive timestamps, falling
/// back to the mean of those deltas, falling back to
/// [`DEFAULT_INTERVAL_SECS`]. Zero and negative deltas are discarded before
/// any aggregation so the result is always positive. The estimate stands in
/// for "how long one missed probe represents" when extrapolating cluster
/// boundaries.
pub fn estimate_nominal_interval(timestamps: &[DateTime<Utc>]) -> f64 {
    let deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|w| delta_secs(w[0], w[1]))
        .filter(|d| *d > 0.0)
        .collect();

    median(&deltas)
        .or_else(|| mean(&deltas))
        .unwrap_or(DEFAULT_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
    }

    #[test]
    fn test_median_of_regular_spacing() {
        let stamps = vec![ts(0), ts(5), ts(10), ts(15)];
        assert_eq!(estimate_nominal_interval(&stamps), 5.0);
    }

    #[test]
    fn test_outlier_gap_does_not_skew_estimate() {
        // One long pause in an otherwise 1s cadence.
        let stamps = vec![ts(0), ts(1), ts(2), ts(3), ts(600)];
        assert_eq!(estimate_nominal_interval(&stamps), 1.0);
    }

    #[test]
    fn test_duplicate_timestamps_are_ignored() {
        let stamps = vec![ts(0), ts(0), ts(2), ts(2), ts(4)];
        assert_eq!(estimate_nominal_interval(&stamps), 2.0);
    }

    #[test]
    fn test_empty_and_single_default_to_one_second() {
        assert_eq!(estimate_nominal_interval(&[]), DEFAULT_INTERVAL_SECS);
        assert_eq!(estimate_nominal_interval(&[ts(0)]), DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn test_all_duplicates_default_to_one_second() {
        let stamps = vec![ts(7), ts(7), ts(7)];
        assert_eq!(estimate_nominal_interval(&stamps), DEFAULT_INTERVAL_SECS);
    }
}
