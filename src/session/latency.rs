//! Live latency percentiles over a t-digest.

use serde::Serialize;
use tdigests::{Centroid, TDigest};

/// New observations buffered before folding into the digest.
const FLUSH_THRESHOLD: usize = 256;

/// Streaming latency tracker for one target's session.
///
/// Exact min/max/mean plus t-digest quantile estimates; observations are
/// batched so the digest is rebuilt at most once per `FLUSH_THRESHOLD`
/// samples.
pub struct LatencyDigest {
    digest: Option<TDigest>,
    pending: Vec<f64>,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for LatencyDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyDigest {
    pub fn new() -> Self {
        Self {
            digest: None,
            pending: Vec::new(),
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn observe(&mut self, value_ms: f64) {
        self.count += 1;
        self.sum += value_ms;
        self.min = self.min.min(value_ms);
        self.max = self.max.max(value_ms);
        self.pending.push(value_ms);
        if self.pending.len() >= FLUSH_THRESHOLD {
            self.flush();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Estimated quantile, `None` before the first observation.
    pub fn quantile(&mut self, q: f64) -> Option<f64> {
        self.flush();
        self.digest.as_ref().map(|d| d.estimate_quantile(q))
    }

    /// Point-in-time summary, `None` before the first observation.
    pub fn summary(&mut self) -> Option<LatencySummary> {
        if self.count == 0 {
            return None;
        }
        self.flush();
        let digest = self.digest.as_ref()?;
        Some(LatencySummary {
            count: self.count,
            min_ms: self.min,
            avg_ms: self.sum / self.count as f64,
            max_ms: self.max,
            p50_ms: digest.estimate_quantile(0.5),
            p90_ms: digest.estimate_quantile(0.9),
            p99_ms: digest.estimate_quantile(0.99),
        })
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut fresh = TDigest::from_values(std::mem::take(&mut self.pending));
        match self.digest.take() {
            Some(existing) => {
                let mut centroids: Vec<Centroid> = existing
                    .centroids()
                    .iter()
                    .chain(fresh.centroids().iter())
                    .map(|c| Centroid::new(c.mean, c.weight))
                    .collect();
                centroids.sort_by(|a, b| {
                    a.mean
                        .partial_cmp(&b.mean)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let mut merged = TDigest::from_centroids(centroids);
                merged.compress(100);
                self.digest = Some(merged);
            }
            None => {
                fresh.compress(100);
                self.digest = Some(fresh);
            }
        }
    }
}

/// Snapshot of the latency distribution, for footers and JSON snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_digest_has_no_summary() {
        let mut digest = LatencyDigest::new();
        assert_eq!(digest.count(), 0);
        assert!(digest.summary().is_none());
        assert!(digest.quantile(0.5).is_none());
    }

    #[test]
    fn test_summary_tracks_exact_extremes() {
        let mut digest = LatencyDigest::new();
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            digest.observe(v);
        }
        let summary = digest.summary().unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min_ms, 10.0);
        assert_eq!(summary.max_ms, 50.0);
        assert_eq!(summary.avg_ms, 30.0);
        assert!((summary.p50_ms - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_quantiles_survive_batched_merges() {
        let mut digest = LatencyDigest::new();
        // Enough observations to force several internal flushes.
        for i in 0..1000 {
            digest.observe(i as f64);
        }
        let p50 = digest.quantile(0.5).unwrap();
        let p99 = digest.quantile(0.99).unwrap();
        assert!((p50 - 500.0).abs() < 25.0);
        assert!(p99 > 950.0);
        assert_eq!(digest.count(), 1000);
    }
}
