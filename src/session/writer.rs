//! Per-target session log files and JSON snapshots.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{LatencyDigest, LatencySummary, SessionError};
use crate::analysis::{ProbeSample, ProbeStatus, SessionAnalysis, SessionMetrics};
use crate::probe::{
    speed_insights, PingOutcome, SpeedStats, ThroughputMeasurement, TimeSync,
};
use crate::report::{self, BANNER};

/// Timestamp format used in every log line and header.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn sync_note(sync: Option<&TimeSync>) -> String {
    match sync {
        Some(sync) => format!(
            "Time Sync: adjusted to {} (offset: {:.2}ms)\n",
            sync.server,
            sync.offset_ms()
        ),
        None => "Time Sync: NTP query failed, using local time\n".to_string(),
    }
}

/// Append-only text log for one ping target.
///
/// Holds the file handle for the whole session and tracks the counters the
/// footer reports.
pub struct PingLogWriter {
    path: PathBuf,
    file: File,
    host: String,
    target: String,
    ping_count: usize,
    success_count: usize,
    timeout_count: usize,
    latency: LatencyDigest,
}

impl PingLogWriter {
    /// Create `{run_name}_{target}.txt` in `dir` and write the header block.
    pub fn create(
        dir: &Path,
        run_name: &str,
        host: &str,
        target: &str,
        sync: Option<&TimeSync>,
        started: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let safe_target = target.replace(['.', ':'], "_");
        let path = dir.join(format!("{}_{}.txt", run_name, safe_target));
        let mut file = File::create(&path)?;

        write!(
            file,
            "\n{BANNER}\nPing Diagnostic Log\n{BANNER}\n\
             Run Name: {run_name}\n\
             Computer Name: {host}\n\
             Target IP: {target}\n\
             Start Time: {}\n\
             {}\
             Log File: {}\n{BANNER}\n\n",
            started.format(LOG_TIME_FORMAT),
            sync_note(sync),
            path.display(),
        )?;

        Ok(Self {
            path,
            file,
            host: host.to_string(),
            target: target.to_string(),
            ping_count: 0,
            success_count: 0,
            timeout_count: 0,
            latency: LatencyDigest::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn latency_summary(&mut self) -> Option<LatencySummary> {
        self.latency.summary()
    }

    /// Append one probe result as a log line.
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        outcome: &PingOutcome,
    ) -> Result<(), SessionError> {
        let icon = if outcome.status == ProbeStatus::Success {
            '✓'
        } else {
            '✗'
        };
        let ttl = outcome
            .ttl
            .map_or_else(|| "N/A".to_string(), |t| t.to_string());
        let time = outcome
            .latency_ms
            .map_or_else(|| "N/A".to_string(), |ms| format!("{}ms", ms));

        writeln!(
            self.file,
            "[{}] {} Computer: {} | IP: {} | Status: {} | TTL: {} | Time: {}",
            timestamp.format(LOG_TIME_FORMAT),
            icon,
            self.host,
            self.target,
            outcome.status.as_log_str(),
            ttl,
            time,
        )?;

        self.ping_count += 1;
        match outcome.status {
            ProbeStatus::Success => {
                self.success_count += 1;
                if let Some(ms) = outcome.latency_ms {
                    self.latency.observe(ms);
                }
            }
            ProbeStatus::Timeout => self.timeout_count += 1,
            _ => {}
        }

        Ok(())
    }

    /// Write the summary footer: counters, latency distribution, and the
    /// engine's full analysis report.
    pub fn finish(
        &mut self,
        analysis: &SessionAnalysis,
        ended: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        write!(
            self.file,
            "\n{BANNER}\nSummary Statistics\n{BANNER}\n\
             Computer Name: {}\nTarget IP: {}\nEnd Time: {}\n\
             Total Pings: {}\nSuccessful: {} ({:.2}%)\nTimeouts: {} ({:.2}%)\n",
            self.host,
            self.target,
            ended.format(LOG_TIME_FORMAT),
            self.ping_count,
            self.success_count,
            percentage(self.success_count, self.ping_count),
            self.timeout_count,
            percentage(self.timeout_count, self.ping_count),
        )?;

        if let Some(summary) = self.latency.summary() {
            writeln!(
                self.file,
                "Latency (ms): min {:.1} / avg {:.1} / max {:.1} | p50 {:.1} / p90 {:.1} / p99 {:.1}",
                summary.min_ms,
                summary.avg_ms,
                summary.max_ms,
                summary.p50_ms,
                summary.p90_ms,
                summary.p99_ms,
            )?;
        }

        writeln!(self.file, "{BANNER}")?;
        write!(self.file, "\n{}", report::render_analysis(analysis))?;
        self.file.flush()?;
        Ok(())
    }
}

/// Append-only text log for a throughput session.
pub struct SpeedLogWriter {
    path: PathBuf,
    file: File,
    host: String,
}

impl SpeedLogWriter {
    /// Create `{run_name}.txt` in `dir` and write the header block.
    pub fn create(
        dir: &Path,
        run_name: &str,
        host: &str,
        sync: Option<&TimeSync>,
        started: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let path = dir.join(format!("{}.txt", run_name));
        let mut file = File::create(&path)?;

        write!(
            file,
            "\n{BANNER}\nSpeed Test Diagnostic Log\n{BANNER}\n\
             Computer Name: {host}\n\
             Start Time (NTP-adjusted): {}\n\
             {}\
             Log File: {}\n{BANNER}\n\n",
            started.format(LOG_TIME_FORMAT),
            sync_note(sync),
            path.display(),
        )?;

        Ok(Self {
            path,
            file,
            host: host.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one measurement as a log line.
    pub fn append(&mut self, m: &ThroughputMeasurement) -> Result<(), SessionError> {
        let icon = if m.ok { '✓' } else { '✗' };
        let mut line = format!(
            "[{}] {} Computer: {} | Download: {:.2} Mbps | Upload: {:.2} Mbps | Ping: {:.1} ms | Status: {}",
            m.timestamp.format(LOG_TIME_FORMAT),
            icon,
            self.host,
            m.download_mbps,
            m.upload_mbps,
            m.ping_ms,
            m.status_label(),
        );
        if let Some(error) = &m.error {
            line.push_str(&format!(" | Error: {}", error));
        }
        writeln!(self.file, "{}", line)?;
        Ok(())
    }

    /// Write summary statistics and guidance for the whole series.
    pub fn finish(
        &mut self,
        measurements: &[ThroughputMeasurement],
        threshold_mbps: f64,
        ended: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if measurements.is_empty() {
            return Ok(());
        }

        let downloads: Vec<f64> = measurements
            .iter()
            .filter(|m| m.ok)
            .map(|m| m.download_mbps)
            .collect();
        let uploads: Vec<f64> = measurements
            .iter()
            .filter(|m| m.ok)
            .map(|m| m.upload_mbps)
            .collect();

        let dl = SpeedStats::of(&downloads);
        let ul = SpeedStats::of(&uploads);
        let low_downloads = downloads.iter().filter(|v| **v < threshold_mbps).count();
        let low_uploads = uploads.iter().filter(|v| **v < threshold_mbps).count();
        let total_ok = downloads.len();

        write!(
            self.file,
            "\n{BANNER}\nSummary Statistics\n{BANNER}\n\
             Computer Name: {}\nEnd Time (NTP-adjusted): {}\n\
             Total Tests (successful): {}\n\n\
             Download (Mbps):\n  Avg:    {:.2}\n  Median: {:.2}\n  Min:    {:.2}\n  Max:    {:.2}\n\n\
             Upload (Mbps):\n  Avg:    {:.2}\n  Median: {:.2}\n  Min:    {:.2}\n  Max:    {:.2}\n\n\
             Low-speed occurrences (<{:.1} Mbps):\n\
             \x20 Download: {} tests ({:.1}% of successful tests)\n\
             \x20 Upload:   {} tests ({:.1}% of successful tests)\n{BANNER}\n",
            self.host,
            ended.format(LOG_TIME_FORMAT),
            total_ok,
            dl.avg,
            dl.median,
            dl.min,
            dl.max,
            ul.avg,
            ul.median,
            ul.min,
            ul.max,
            threshold_mbps,
            low_downloads,
            percentage(low_downloads, total_ok),
            low_uploads,
            percentage(low_uploads, total_ok),
        )?;

        let insights = speed_insights(&dl, &ul, threshold_mbps);
        if !insights.is_empty() {
            write!(self.file, "\nInsights & Guidance\n{BANNER}\n")?;
            for line in &insights {
                writeln!(self.file, "- {}", line)?;
            }
        }
        self.file.flush()?;
        Ok(())
    }
}

/// One target's slice of the ping snapshot document.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSnapshot {
    pub target: String,
    pub log_file: String,
    pub metrics: SessionMetrics,
    pub insights: Vec<String>,
    pub latency: Option<LatencySummary>,
    pub recent_samples: Vec<ProbeSample>,
}

/// Snapshot document the dashboard serves for ping sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub run_name: String,
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub targets: Vec<TargetSnapshot>,
}

/// Snapshot document the dashboard serves for throughput sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedSnapshot {
    pub run_name: String,
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub download: SpeedStats,
    pub upload: SpeedStats,
    pub insights: Vec<String>,
    pub measurements: Vec<ThroughputMeasurement>,
}

/// Write `{run_name}_snapshot.json` into `dir`; returns the path written.
pub fn write_snapshot<T: Serialize>(
    dir: &Path,
    run_name: &str,
    snapshot: &T,
) -> Result<PathBuf, SessionError> {
    let path = dir.join(format!("{}_snapshot.json", run_name));
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_session;
    use chrono::TimeZone;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
            + chrono::Duration::seconds(offset_secs)
    }

    fn success(latency_ms: f64, ttl: u32) -> PingOutcome {
        PingOutcome {
            status: ProbeStatus::Success,
            latency_ms: Some(latency_ms),
            ttl: Some(ttl),
        }
    }

    fn timeout() -> PingOutcome {
        PingOutcome {
            status: ProbeStatus::Timeout,
            latency_ms: None,
            ttl: None,
        }
    }

    #[test]
    fn test_ping_log_has_header_lines_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            PingLogWriter::create(dir.path(), "run_ping_test", "BOX", "8.8.8.8", None, ts(0))
                .unwrap();

        let samples = vec![
            ProbeSample::new(ts(0), ProbeStatus::Success, Some(12.0)),
            ProbeSample::new(ts(1), ProbeStatus::Timeout, None),
            ProbeSample::new(ts(2), ProbeStatus::Success, Some(14.5)),
        ];
        writer.append(ts(0), &success(12.0, 117)).unwrap();
        writer.append(ts(1), &timeout()).unwrap();
        writer.append(ts(2), &success(14.5, 117)).unwrap();
        writer.finish(&analyze_session(&samples), ts(3)).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("Run Name: run_ping_test"));
        assert!(content.contains("Target IP: 8.8.8.8"));
        assert!(content.contains("Status: SUCCESS | TTL: 117 | Time: 12ms"));
        assert!(content.contains("Status: TIMEOUT | TTL: N/A | Time: N/A"));
        assert!(content.contains("Total Pings: 3"));
        assert!(content.contains("Successful: 2 (66.67%)"));
        assert!(content.contains("Timeouts: 1 (33.33%)"));
        assert!(content.contains("Insights & Guidance"));
    }

    #[test]
    fn test_log_file_name_sanitizes_target() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            PingLogWriter::create(dir.path(), "net_ping_run", "BOX", "192.168.4.1", None, ts(0))
                .unwrap();
        assert!(writer
            .path()
            .to_string_lossy()
            .ends_with("net_ping_run_192_168_4_1.txt"));
    }

    #[test]
    fn test_speed_log_line_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            SpeedLogWriter::create(dir.path(), "net_speedtest_run", "BOX", None, ts(0)).unwrap();

        let measurements = vec![
            ThroughputMeasurement {
                timestamp: ts(0),
                download_mbps: 42.5,
                upload_mbps: 11.0,
                ping_ms: 18.2,
                ok: true,
                error: None,
            },
            ThroughputMeasurement {
                timestamp: ts(300),
                download_mbps: 0.0,
                upload_mbps: 0.0,
                ping_ms: 0.0,
                ok: false,
                error: Some("dns failure".to_string()),
            },
        ];
        for m in &measurements {
            writer.append(m).unwrap();
        }
        writer.finish(&measurements, 10.0, ts(600)).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("Download: 42.50 Mbps | Upload: 11.00 Mbps"));
        assert!(content.contains("Status: ERROR | Error: dns failure"));
        assert!(content.contains("Total Tests (successful): 1"));
        assert!(content.contains("Low-speed occurrences (<10.0 Mbps):"));
    }

    #[test]
    fn test_snapshot_round_trips_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![ProbeSample::new(ts(0), ProbeStatus::Timeout, None)];
        let analysis = analyze_session(&samples);
        let snapshot = SessionSnapshot {
            run_name: "net_ping_run".to_string(),
            host: "BOX".to_string(),
            generated_at: ts(10),
            targets: vec![TargetSnapshot {
                target: "8.8.8.8".to_string(),
                log_file: "net_ping_run_8_8_8_8.txt".to_string(),
                metrics: analysis.metrics.clone(),
                insights: analysis.insights.clone(),
                latency: None,
                recent_samples: samples,
            }],
        };

        let path = write_snapshot(dir.path(), &snapshot.run_name, &snapshot).unwrap();
        assert!(path.to_string_lossy().ends_with("net_ping_run_snapshot.json"));

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["host"], "BOX");
        assert_eq!(parsed["targets"][0]["metrics"]["cluster_count"], 1);
    }
}
