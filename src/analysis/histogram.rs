//! Fixed-band histogram of disruption durations.

use serde::Serialize;

/// Band edges in seconds. Each band is left-open, right-closed: a duration
/// `d` falls in band `i` when `EDGES[i] < d <= EDGES[i+1]`, and everything
/// past the last edge lands in the final open-ended band.
const BAND_EDGES: [f64; 6] = [0.0, 1.0, 2.0, 5.0, 10.0, 30.0];

const BAND_LABELS: [&str; 6] = ["0-1s", "1-2s", "2-5s", "5-10s", "10-30s", "30s+"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBand {
    pub label: &'static str,
    pub count: usize,
}

/// How disruption durations distribute across the fixed bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationHistogram {
    pub bands: Vec<HistogramBand>,
}

impl DurationHistogram {
    pub fn total(&self) -> usize {
        self.bands.iter().map(|b| b.count).sum()
    }
}

/// Bucket cluster durations into the fixed bands.
///
/// Every positive duration lands in exactly one band; boundary values go to
/// the lower band (a 2.0s outage counts as "1-2s", not "2-5s").
pub fn duration_histogram(durations: &[f64]) -> DurationHistogram {
    let mut counts = [0usize; 6];
    for &d in durations {
        if let Some(i) = band_index(d) {
            counts[i] += 1;
        }
    }
    DurationHistogram {
        bands: BAND_LABELS
            .iter()
            .zip(counts)
            .map(|(label, count)| HistogramBand { label, count })
            .collect(),
    }
}

fn band_index(duration_secs: f64) -> Option<usize> {
    if duration_secs <= 0.0 || duration_secs.is_nan() {
        return None;
    }
    for (i, pair) in BAND_EDGES.windows(2).enumerate() {
        if duration_secs <= pair[1] {
            return Some(i);
        }
    }
    Some(BAND_EDGES.len() - 1)
}
