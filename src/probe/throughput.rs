//! HTTP throughput probe.
//!
//! Measures download and upload rates against speed-test endpoints by
//! timing chunk-counted transfers, plus a small round trip for latency.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ProbeError;
use crate::analysis::stats::{mean, median};

/// Throughput probe configuration.
#[derive(Debug, Clone)]
pub struct ThroughputConfig {
    pub download_url: String,
    pub upload_url: String,
    pub upload_bytes: usize,
    pub low_speed_threshold_mbps: f64,
    pub timeout: Duration,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            download_url: "https://speed.cloudflare.com/__down?bytes=10000000".to_string(),
            upload_url: "https://speed.cloudflare.com/__up".to_string(),
            upload_bytes: 2_000_000,
            low_speed_threshold_mbps: 10.0,
            timeout: Duration::from_secs(120),
        }
    }
}

/// One speed-test round, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputMeasurement {
    pub timestamp: DateTime<Utc>,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub ok: bool,
    pub error: Option<String>,
}

impl ThroughputMeasurement {
    pub fn status_label(&self) -> &'static str {
        if self.ok {
            "OK"
        } else {
            "ERROR"
        }
    }
}

/// Run one full measurement round. Failures come back as a zeroed
/// measurement with `ok = false` and the error text attached; the caller's
/// loop never has to unwind.
pub async fn measure_throughput(
    client: &reqwest::Client,
    config: &ThroughputConfig,
    timestamp: DateTime<Utc>,
) -> ThroughputMeasurement {
    match try_measure(client, config).await {
        Ok((download_mbps, upload_mbps, ping_ms)) => ThroughputMeasurement {
            timestamp,
            download_mbps,
            upload_mbps,
            ping_ms,
            ok: true,
            error: None,
        },
        Err(e) => ThroughputMeasurement {
            timestamp,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            ping_ms: 0.0,
            ok: false,
            error: Some(e.to_string()),
        },
    }
}

async fn try_measure(
    client: &reqwest::Client,
    config: &ThroughputConfig,
) -> Result<(f64, f64, f64), ProbeError> {
    let ping_ms = measure_latency(client, &config.download_url, config.timeout).await?;
    let download_mbps = measure_download(client, &config.download_url, config.timeout).await?;
    let upload_mbps = measure_upload(
        client,
        &config.upload_url,
        config.upload_bytes,
        config.timeout,
    )
    .await?;
    Ok((download_mbps, upload_mbps, ping_ms))
}

/// Time a HEAD round trip to the endpoint.
async fn measure_latency(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<f64, ProbeError> {
    let start = Instant::now();
    client.head(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;
    Ok(start.elapsed().as_secs_f64() * 1000.0)
}

async fn measure_download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<f64, ProbeError> {
    let start = Instant::now();
    let mut response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;
    if !response.status().is_success() {
        return Err(ProbeError::Protocol(format!(
            "download endpoint returned {}",
            response.status()
        )));
    }

    let mut byte_count: usize = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })? {
        byte_count += chunk.len();
    }

    let elapsed = start.elapsed().as_secs_f64();
    if byte_count == 0 || elapsed <= 0.0 {
        return Err(ProbeError::Protocol(
            "download produced no measurable data".to_string(),
        ));
    }
    Ok(mbps(byte_count, elapsed))
}

async fn measure_upload(
    client: &reqwest::Client,
    url: &str,
    upload_bytes: usize,
    timeout: Duration,
) -> Result<f64, ProbeError> {
    let payload = vec![0u8; upload_bytes];

    let start = Instant::now();
    let response = client.post(url).body(payload).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;
    if !response.status().is_success() {
        return Err(ProbeError::Protocol(format!(
            "upload endpoint returned {}",
            response.status()
        )));
    }
    let _ = response.bytes().await;

    let elapsed = start.elapsed().as_secs_f64();
    if elapsed <= 0.0 {
        return Err(ProbeError::Protocol(
            "upload produced no measurable data".to_string(),
        ));
    }
    Ok(mbps(upload_bytes, elapsed))
}

fn mbps(byte_count: usize, elapsed_secs: f64) -> f64 {
    byte_count as f64 * 8.0 / 1_000_000.0 / elapsed_secs
}

/// Avg/median/min/max of a speed series; all zero when the series is empty
/// so summaries can always print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedStats {
    pub avg: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl SpeedStats {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                avg: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        Self {
            avg: mean(values).unwrap_or(0.0),
            median: median(values).unwrap_or(0.0),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Guidance lines for a speed-test series, keyed off the low-speed
/// threshold.
pub fn speed_insights(download: &SpeedStats, upload: &SpeedStats, threshold: f64) -> Vec<String> {
    let mut insights = Vec::new();

    if download.avg < threshold || upload.avg < threshold {
        insights.push(format!(
            "Average throughput is below {threshold:.1} Mbps, indicating under-performing service"
        ));
    } else {
        insights.push("Average throughput is above the low-speed threshold".to_string());
    }

    if download.min < threshold / 2.0 || upload.min < threshold / 2.0 {
        insights.push(
            "Some tests fell below half the threshold, suggesting intermittent severe slowdowns"
                .to_string(),
        );
    }

    if download.max > 2.0 * threshold || upload.max > 2.0 * threshold {
        insights.push(
            "Throughput varies significantly between tests; some runs are much faster than others"
                .to_string(),
        );
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbps_conversion() {
        // 1.25 MB in one second is 10 Mbit/s.
        assert_eq!(mbps(1_250_000, 1.0), 10.0);
        assert_eq!(mbps(1_250_000, 2.0), 5.0);
    }

    #[test]
    fn test_speed_stats_of_series() {
        let stats = SpeedStats::of(&[20.0, 40.0, 30.0]);
        assert_eq!(stats.avg, 30.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 40.0);
    }

    #[test]
    fn test_speed_stats_empty_is_all_zero() {
        let stats = SpeedStats::of(&[]);
        assert_eq!(stats, SpeedStats { avg: 0.0, median: 0.0, min: 0.0, max: 0.0 });
    }

    #[test]
    fn test_insights_flag_slow_service() {
        let slow = SpeedStats::of(&[3.0, 4.0]);
        let fine = SpeedStats::of(&[50.0, 52.0]);
        let insights = speed_insights(&slow, &fine, 10.0);
        assert!(insights[0].contains("below 10.0 Mbps"));
        assert!(insights.iter().any(|i| i.contains("half the threshold")));
    }

    #[test]
    fn test_insights_flag_spread() {
        let steady = SpeedStats::of(&[15.0, 16.0]);
        let spiky = SpeedStats::of(&[15.0, 80.0]);
        let insights = speed_insights(&steady, &spiky, 10.0);
        assert!(insights[0].contains("above the low-speed threshold"));
        assert!(insights.iter().any(|i| i.contains("varies significantly")));
    }

    #[tokio::test]
    async fn test_measure_throughput_unresolvable_host_reports_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let config = ThroughputConfig {
            download_url: "http://netdrift-test.invalid/__down".to_string(),
            upload_url: "http://netdrift-test.invalid/__up".to_string(),
            upload_bytes: 16,
            ..Default::default()
        };
        let measurement =
            measure_throughput(&client, &config, chrono::Utc::now()).await;
        assert!(!measurement.ok);
        assert_eq!(measurement.download_mbps, 0.0);
        assert!(measurement.error.is_some());
        assert_eq!(measurement.status_label(), "ERROR");
    }
}
