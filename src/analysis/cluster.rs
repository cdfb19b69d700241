//! Grouping of consecutive failed probes into disruption clusters.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sample::ProbeSample;
use super::stats::delta_secs;

/// A maximal run of consecutive timed-out probes.
///
/// Boundaries are extrapolated one nominal interval past the last failing
/// sample: the outage is only confirmed over at the next probe that did not
/// fail, so the last miss is assumed to cover a full interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisruptionCluster {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sample_count: usize,
    pub duration_secs: f64,
}

/// Group consecutive disruption samples into clusters, in input order.
///
/// Adjacency means an unbroken run of failing samples; nearby clusters are
/// never merged across a successful probe, however close. A run of one is
/// assumed to last exactly one nominal interval.
pub fn cluster_disruptions(
    samples: &[ProbeSample],
    nominal_interval_secs: f64,
) -> Vec<DisruptionCluster> {
    let mut clusters = Vec::new();
    let mut run: Option<Run> = None;

    for sample in samples {
        if sample.is_disruption() {
            run = Some(match run {
                Some(open) => open.extend(sample.timestamp),
                None => Run::starting(sample.timestamp),
            });
        } else if let Some(open) = run.take() {
            clusters.push(open.close(nominal_interval_secs));
        }
    }
    if let Some(open) = run {
        clusters.push(open.close(nominal_interval_secs));
    }

    clusters
}

/// An in-progress run of failing samples.
struct Run {
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    count: usize,
}

impl Run {
    fn starting(at: DateTime<Utc>) -> Self {
        Self {
            first: at,
            last: at,
            count: 1,
        }
    }

    fn extend(mut self, at: DateTime<Utc>) -> Self {
        self.last = at;
        self.count += 1;
        self
    }

    fn close(self, nominal_interval_secs: f64) -> DisruptionCluster {
        let duration_secs = if self.count == 1 {
            nominal_interval_secs
        } else {
            delta_secs(self.first, self.last) + nominal_interval_secs
        };
        DisruptionCluster {
            start: self.first,
            end: self.last + secs_to_duration(nominal_interval_secs),
            sample_count: self.count,
            duration_secs,
        }
    }
}

fn secs_to_duration(secs: f64) -> chrono::Duration {
    chrono::Duration::microseconds((secs * 1e6).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample::{ProbeSample, ProbeStatus};
    use chrono::TimeZone;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
    }

    fn ok(offset_secs: i64) -> ProbeSample {
        ProbeSample::new(ts(offset_secs), ProbeStatus::Success, Some(12.0))
    }

    fn timeout(offset_secs: i64) -> ProbeSample {
        ProbeSample::new(ts(offset_secs), ProbeStatus::Timeout, None)
    }

    #[test]
    fn test_all_success_yields_no_clusters() {
        let samples = vec![ok(0), ok(1), ok(2), ok(3)];
        assert!(cluster_disruptions(&samples, 1.0).is_empty());
    }

    #[test]
    fn test_single_isolated_failure_lasts_one_interval() {
        let samples = vec![ok(0), timeout(5), ok(10)];
        let clusters = cluster_disruptions(&samples, 5.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].sample_count, 1);
        assert_eq!(clusters[0].duration_secs, 5.0);
        assert_eq!(clusters[0].start, ts(5));
        assert_eq!(clusters[0].end, ts(10));
    }

    #[test]
    fn test_consecutive_failures_span_plus_one_interval() {
        // n failures spaced s seconds apart: duration (n-1)*s + nominal.
        let samples = vec![ok(0), timeout(2), timeout(4), timeout(6), ok(8)];
        let clusters = cluster_disruptions(&samples, 2.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].sample_count, 3);
        assert_eq!(clusters[0].duration_secs, (3 - 1) as f64 * 2.0 + 2.0);
        assert_eq!(clusters[0].end, ts(8));
    }

    #[test]
    fn test_success_splits_runs_even_when_adjacent() {
        // Two misses, a reply, one more miss: two clusters, never merged.
        let samples = vec![timeout(0), timeout(1), ok(2), timeout(3)];
        let clusters = cluster_disruptions(&samples, 1.0);
        assert_eq!(clusters.len(), 2);

        assert_eq!(clusters[0].start, ts(0));
        assert_eq!(clusters[0].end, ts(2));
        assert_eq!(clusters[0].sample_count, 2);
        assert_eq!(clusters[0].duration_secs, 2.0);

        assert_eq!(clusters[1].start, ts(3));
        assert_eq!(clusters[1].end, ts(4));
        assert_eq!(clusters[1].sample_count, 1);
        assert_eq!(clusters[1].duration_secs, 1.0);
    }

    #[test]
    fn test_trailing_run_is_closed_at_end_of_input() {
        let samples = vec![ok(0), timeout(1), timeout(2)];
        let clusters = cluster_disruptions(&samples, 1.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].sample_count, 2);
        assert_eq!(clusters[0].end, ts(3));
    }

    #[test]
    fn test_non_timeout_failures_close_but_never_extend_a_run() {
        let samples = vec![
            timeout(0),
            ProbeSample::new(ts(1), ProbeStatus::Unreachable, None),
            timeout(2),
            ProbeSample::new(ts(3), ProbeStatus::Error, None),
        ];
        let clusters = cluster_disruptions(&samples, 1.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].sample_count, 1);
        assert_eq!(clusters[1].sample_count, 1);
    }

    #[test]
    fn test_fractional_interval_extends_end_precisely() {
        let samples = vec![timeout(0)];
        let clusters = cluster_disruptions(&samples, 2.5);
        assert_eq!(clusters[0].end, ts(0) + chrono::Duration::milliseconds(2500));
        assert_eq!(clusters[0].duration_secs, 2.5);
    }

    #[test]
    fn test_duplicate_timestamps_do_not_break_clustering() {
        let samples = vec![timeout(0), timeout(0), ok(0)];
        let clusters = cluster_disruptions(&samples, 1.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].sample_count, 2);
        // Zero measured span still earns the one-interval extrapolation.
        assert_eq!(clusters[0].duration_secs, 1.0);
    }
}
