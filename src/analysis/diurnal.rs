//! Hour-of-day failure patterns across calendar days.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use super::stats::{delta_secs, mean};

/// Consecutive same-hour failures farther apart than this are treated as
/// belonging to different days and excluded from interval averages. The
/// threshold is a fixed heuristic kept for output compatibility, not a real
/// day-boundary computation.
pub const SAME_DAY_GAP_SECS: f64 = 2.0 * 3600.0;

/// Failure activity for one hour of the day, date abstracted: failures from
/// any calendar day whose clock hour matches land here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub failure_count: usize,
    /// Mean gap between same-day consecutive failures in this hour, `None`
    /// when fewer than two failures or when every gap crossed days.
    pub avg_interval_secs: Option<f64>,
}

/// A 24-bucket hour-of-day failure profile for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPattern {
    /// Always 24 entries, indexed by hour.
    pub buckets: Vec<HourBucket>,
}

impl HourlyPattern {
    /// Build the profile from a session's failure timestamps. The calendar
    /// date is discarded for bucketing, so many days overlay onto one
    /// 24-hour axis.
    pub fn from_failures(failures: &[DateTime<Utc>]) -> Self {
        let mut by_hour: [Vec<DateTime<Utc>>; 24] = std::array::from_fn(|_| Vec::new());
        for ts in failures {
            by_hour[ts.hour() as usize].push(*ts);
        }

        let buckets = by_hour
            .iter()
            .enumerate()
            .map(|(hour, hits)| HourBucket {
                hour: hour as u32,
                failure_count: hits.len(),
                avg_interval_secs: same_day_average_interval(hits),
            })
            .collect();

        Self { buckets }
    }

    pub fn total_failures(&self) -> usize {
        self.buckets.iter().map(|b| b.failure_count).sum()
    }

    /// The busiest hour, ties broken by the earlier hour. `None` for a
    /// session with no failures at all.
    pub fn peak_hour(&self) -> Option<&HourBucket> {
        self.buckets
            .iter()
            .filter(|b| b.failure_count > 0)
            .max_by(|a, b| {
                a.failure_count
                    .cmp(&b.failure_count)
                    // max_by keeps the later of equal elements; invert hour
                    // order so the earlier hour wins ties.
                    .then(b.hour.cmp(&a.hour))
            })
    }
}

/// A named session's hourly profile, for overlaying several sessions on a
/// shared hour-of-day axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPattern {
    pub name: String,
    pub pattern: HourlyPattern,
}

pub fn aggregate_sessions(sessions: &[(String, Vec<DateTime<Utc>>)]) -> Vec<SessionPattern> {
    sessions
        .iter()
        .map(|(name, failures)| SessionPattern {
            name: name.clone(),
            pattern: HourlyPattern::from_failures(failures),
        })
        .collect()
}

fn same_day_average_interval(hits: &[DateTime<Utc>]) -> Option<f64> {
    if hits.len() < 2 {
        return None;
    }
    let mut sorted = hits.to_vec();
    sorted.sort();
    let kept: Vec<f64> = sorted
        .windows(2)
        .map(|pair| delta_secs(pair[0], pair[1]))
        .filter(|gap| *gap < SAME_DAY_GAP_SECS)
        .collect();
    mean(&kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_bucketing_abstracts_calendar_date() {
        let failures = vec![at(2024, 1, 1, 3, 0, 0), at(2024, 2, 15, 3, 0, 0)];
        let pattern = HourlyPattern::from_failures(&failures);
        assert_eq!(pattern.buckets[3].failure_count, 2);
        assert_eq!(pattern.total_failures(), 2);
    }

    #[test]
    fn test_cross_midnight_pair_splits_buckets() {
        // 23:58 and 00:02 the next day land in different buckets, so
        // neither hour gets an interval from the pair.
        let failures = vec![at(2024, 1, 1, 23, 58, 0), at(2024, 1, 2, 0, 2, 0)];
        let pattern = HourlyPattern::from_failures(&failures);
        assert_eq!(pattern.buckets[23].failure_count, 1);
        assert_eq!(pattern.buckets[0].failure_count, 1);
        assert_eq!(pattern.buckets[23].avg_interval_secs, None);
        assert_eq!(pattern.buckets[0].avg_interval_secs, None);
    }

    #[test]
    fn test_cross_day_gap_within_hour_is_excluded() {
        // Same clock hour on consecutive days: the 24h gap must not count.
        let failures = vec![at(2024, 1, 1, 14, 10, 0), at(2024, 1, 2, 14, 10, 0)];
        let pattern = HourlyPattern::from_failures(&failures);
        assert_eq!(pattern.buckets[14].failure_count, 2);
        assert_eq!(pattern.buckets[14].avg_interval_secs, None);
    }

    #[test]
    fn test_average_interval_mixes_days_but_keeps_same_day_gaps() {
        // Five hour-14 failures across days with consecutive sorted gaps of
        // 300s, 400s, one cross-day gap, and 350s. Average = 350.
        let failures = vec![
            at(2024, 1, 1, 14, 0, 0),
            at(2024, 1, 1, 14, 5, 0),
            at(2024, 1, 1, 14, 11, 40),
            at(2024, 1, 2, 14, 0, 0),
            at(2024, 1, 2, 14, 5, 50),
        ];
        let pattern = HourlyPattern::from_failures(&failures);
        assert_eq!(pattern.buckets[14].failure_count, 5);
        assert_eq!(pattern.buckets[14].avg_interval_secs, Some(350.0));
    }

    #[test]
    fn test_unsorted_input_is_sorted_before_intervals() {
        let failures = vec![at(2024, 1, 1, 9, 10, 0), at(2024, 1, 1, 9, 0, 0)];
        let pattern = HourlyPattern::from_failures(&failures);
        assert_eq!(pattern.buckets[9].avg_interval_secs, Some(600.0));
    }

    #[test]
    fn test_peak_hour_ties_break_to_earlier_hour() {
        let failures = vec![
            at(2024, 1, 1, 8, 0, 0),
            at(2024, 1, 1, 8, 30, 0),
            at(2024, 1, 1, 17, 0, 0),
            at(2024, 1, 1, 17, 30, 0),
        ];
        let pattern = HourlyPattern::from_failures(&failures);
        let peak = pattern.peak_hour().map(|b| b.hour);
        assert_eq!(peak, Some(8));
    }

    #[test]
    fn test_no_failures_has_no_peak() {
        let pattern = HourlyPattern::from_failures(&[]);
        assert_eq!(pattern.peak_hour(), None);
        assert_eq!(pattern.buckets.len(), 24);
        assert!(pattern.buckets.iter().all(|b| b.failure_count == 0));
    }

    #[test]
    fn test_aggregate_keeps_sessions_separate() {
        let sessions = vec![
            ("morning run".to_string(), vec![at(2024, 1, 1, 6, 0, 0)]),
            ("evening run".to_string(), vec![at(2024, 1, 1, 19, 0, 0)]),
        ];
        let patterns = aggregate_sessions(&sessions);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].pattern.buckets[6].failure_count, 1);
        assert_eq!(patterns[0].pattern.buckets[19].failure_count, 0);
        assert_eq!(patterns[1].pattern.buckets[19].failure_count, 1);
    }
}
