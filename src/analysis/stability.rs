//! Session-level stability metrics derived from disruption clusters.

use serde::Serialize;

use super::cluster::DisruptionCluster;
use super::sample::ProbeSample;
use super::stats::{delta_secs, median};

/// Aggregate health figures for one probe session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub sample_count: usize,
    pub failure_count: usize,
    pub cluster_count: usize,
    /// Wall-clock span from first to last sample, 0 for fewer than two.
    pub span_secs: f64,
    pub nominal_interval_secs: f64,
    pub median_disruption_secs: Option<f64>,
    /// Median healthy gap between clusters, `None` when under two clusters
    /// or when every gap collapsed to zero.
    pub median_stable_secs: Option<f64>,
    pub total_disruption_secs: f64,
    /// Clusters per hour of span; for sub-measurable spans this degrades to
    /// the raw cluster count.
    pub disruptions_per_hour: f64,
    /// Fraction of the span spent inside clusters, 0 when the span is 0.
    pub downtime_ratio: f64,
}

/// Healthy gaps between consecutive clusters, in seconds.
///
/// Each gap runs from one cluster's extrapolated end to the next cluster's
/// start. Non-positive gaps (overlapping or back-to-back clusters) are
/// dropped rather than reported as zero or negative periods.
pub fn stable_periods(clusters: &[DisruptionCluster]) -> Vec<f64> {
    clusters
        .windows(2)
        .map(|pair| delta_secs(pair[0].end, pair[1].start))
        .filter(|gap| *gap > 0.0)
        .collect()
}

/// Compute session metrics from the samples, their clusters, and the
/// nominal interval the clusters were built with.
pub fn session_metrics(
    samples: &[ProbeSample],
    clusters: &[DisruptionCluster],
    nominal_interval_secs: f64,
) -> SessionMetrics {
    let span_secs = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() > 1 => {
            delta_secs(first.timestamp, last.timestamp)
        }
        _ => 0.0,
    };

    let durations: Vec<f64> = clusters.iter().map(|c| c.duration_secs).collect();
    let total_disruption_secs = durations.iter().sum();

    let span_hours = span_secs / 3600.0;
    let disruptions_per_hour = if span_hours > 0.0 {
        clusters.len() as f64 / span_hours
    } else {
        clusters.len() as f64
    };

    let downtime_ratio = if span_secs > 0.0 {
        total_disruption_secs / span_secs
    } else {
        0.0
    };

    SessionMetrics {
        sample_count: samples.len(),
        failure_count: samples.iter().filter(|s| s.is_disruption()).count(),
        cluster_count: clusters.len(),
        span_secs,
        nominal_interval_secs,
        median_disruption_secs: median(&durations),
        median_stable_secs: median(&stable_periods(clusters)),
        total_disruption_secs,
        disruptions_per_hour,
        downtime_ratio,
    }
}
