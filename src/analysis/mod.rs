//! Disruption-analysis engine.
//!
//! Pure, synchronous transformations from ordered probe samples to
//! disruption clusters, stability metrics, duration histograms, guidance
//! strings, and hour-of-day failure patterns. Nothing here does I/O or
//! keeps state across calls: [`analyze_session`] returns a fresh value
//! every time and callers own the result, so sessions can be analyzed in
//! parallel without coordination.

mod cluster;
mod diurnal;
mod histogram;
mod insight;
mod interval;
mod sample;
mod stability;
pub(crate) mod stats;

pub use cluster::{cluster_disruptions, DisruptionCluster};
pub use diurnal::{
    aggregate_sessions, HourBucket, HourlyPattern, SessionPattern, SAME_DAY_GAP_SECS,
};
pub use histogram::{duration_histogram, DurationHistogram, HistogramBand};
pub use insight::{format_secs, generate_insights};
pub use interval::{estimate_nominal_interval, DEFAULT_INTERVAL_SECS};
pub use sample::{ProbeSample, ProbeStatus};
pub use stability::{session_metrics, stable_periods, SessionMetrics};

use serde::Serialize;

/// Everything the single-session pipeline derives from one sample list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionAnalysis {
    pub metrics: SessionMetrics,
    pub clusters: Vec<DisruptionCluster>,
    pub histogram: DurationHistogram,
    pub insights: Vec<String>,
}

/// Run the full single-session pipeline.
///
/// Samples must be ordered by timestamp non-decreasing; duplicates are
/// tolerated. Degenerate input (empty, single sample, no failures) yields
/// empty collections and `None` medians rather than an error.
pub fn analyze_session(samples: &[ProbeSample]) -> SessionAnalysis {
    let timestamps: Vec<_> = samples.iter().map(|s| s.timestamp).collect();
    let nominal = estimate_nominal_interval(&timestamps);
    let clusters = cluster_disruptions(samples, nominal);
    let metrics = session_metrics(samples, &clusters, nominal);

    let durations: Vec<f64> = clusters.iter().map(|c| c.duration_secs).collect();
    let histogram = duration_histogram(&durations);
    let insights = generate_insights(&metrics);

    SessionAnalysis {
        metrics,
        clusters,
        histogram,
        insights,
    }
}

/// Failure timestamps of a session, the diurnal aggregator's input.
pub fn failure_timestamps(samples: &[ProbeSample]) -> Vec<chrono::DateTime<chrono::Utc>> {
    samples
        .iter()
        .filter(|s| s.is_disruption())
        .map(|s| s.timestamp)
        .collect()
}
