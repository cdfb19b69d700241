//! Console rendering for session analyses and hourly pattern reports.

use std::fs;
use std::path::Path;

use crate::analysis::{
    aggregate_sessions, analyze_session, failure_timestamps, format_secs, DurationHistogram,
    HourlyPattern, SessionAnalysis,
};
use crate::session::{discover_logs, read_log_file, SessionError, LOG_TIME_FORMAT};

pub(crate) const BANNER: &str =
    "================================================================================";

const HISTOGRAM_BAR_WIDTH: usize = 40;

/// Render one session analysis as the multi-section text block that goes to
/// stdout and into log footers.
///
/// Probe-record lines all start with a bracketed timestamp and carry a
/// `Status:` field; nothing rendered here may look like one, or re-reading a
/// finished log would pick up phantom samples.
pub fn render_analysis(analysis: &SessionAnalysis) -> String {
    let m = &analysis.metrics;
    let mut lines: Vec<String> = Vec::new();

    lines.push("Disruption Analysis".to_string());
    lines.push(BANNER.to_string());
    lines.push(format!(
        "Samples: {} | Failures: {} | Disruption clusters: {}",
        m.sample_count, m.failure_count, m.cluster_count
    ));
    lines.push(format!(
        "Session span: {} | Nominal probe interval: {:.2}s",
        format_secs(m.span_secs),
        m.nominal_interval_secs
    ));
    lines.push(format!(
        "Total downtime: {} ({:.2}% of span)",
        format_secs(m.total_disruption_secs),
        m.downtime_ratio * 100.0
    ));

    if !analysis.clusters.is_empty() {
        lines.push(String::new());
        lines.push("Disruption clusters:".to_string());
        for (i, cluster) in analysis.clusters.iter().enumerate() {
            lines.push(format!(
                "  #{:<3} {} -> {}  {} ({} samples)",
                i + 1,
                cluster.start.format(LOG_TIME_FORMAT),
                cluster.end.format(LOG_TIME_FORMAT),
                format_secs(cluster.duration_secs),
                cluster.sample_count
            ));
        }

        lines.push(String::new());
        lines.push("Cluster duration histogram:".to_string());
        lines.extend(render_histogram(&analysis.histogram));

        lines.push(String::new());
        let median_disruption = m
            .median_disruption_secs
            .map_or_else(|| "n/a".to_string(), format_secs);
        let median_stable = m
            .median_stable_secs
            .map_or_else(|| "n/a".to_string(), format_secs);
        lines.push(format!(
            "Median disruption: {} | Median stable period: {} | Disruptions/hour: {:.2}",
            median_disruption, median_stable, m.disruptions_per_hour
        ));
    }

    lines.push(String::new());
    lines.push("Insights & Guidance".to_string());
    lines.push(BANNER.to_string());
    for insight in &analysis.insights {
        lines.push(format!("- {}", insight));
    }

    lines.join("\n") + "\n"
}

fn render_histogram(histogram: &DurationHistogram) -> Vec<String> {
    let max = histogram
        .bands
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0);

    histogram
        .bands
        .iter()
        .map(|band| {
            let bar = scaled_bar(band.count, max);
            format!("  {:<7} {:<width$} {}", band.label, bar, band.count, width = HISTOGRAM_BAR_WIDTH)
        })
        .collect()
}

fn scaled_bar(count: usize, max: usize) -> String {
    if count == 0 || max == 0 {
        return String::new();
    }
    let len = (count as f64 / max as f64 * HISTOGRAM_BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.max(1))
}

fn render_hourly(pattern: &HourlyPattern) -> Vec<String> {
    let mut lines = Vec::new();
    let active: Vec<_> = pattern
        .buckets
        .iter()
        .filter(|b| b.failure_count > 0)
        .collect();

    if active.is_empty() {
        lines.push("  No failures recorded.".to_string());
        return lines;
    }

    lines.push(format!(
        "  Failures: {} across {} active hours",
        pattern.total_failures(),
        active.len()
    ));
    lines.push("  Hour   Failures  Avg interval".to_string());
    for bucket in &active {
        let avg = bucket
            .avg_interval_secs
            .map_or_else(|| "n/a".to_string(), format_secs);
        lines.push(format!(
            "  {:02}:00  {:>8}  {}",
            bucket.hour, bucket.failure_count, avg
        ));
    }
    if let Some(peak) = pattern.peak_hour() {
        lines.push(format!(
            "  Peak hour: {:02}:00 ({} failures)",
            peak.hour, peak.failure_count
        ));
    }
    lines
}

/// Parse one finished session log and print its analysis.
pub fn run_report(log_file: &Path) -> Result<(), SessionError> {
    let session = read_log_file(log_file)?;
    let analysis = analyze_session(&session.samples);

    println!("{BANNER}");
    println!("Session Report: {} (target: {})", session.name, session.target);
    println!("{BANNER}");
    println!(
        "Parsed {} samples from {}\n",
        session.samples.len(),
        session.path.display()
    );
    println!("{}", render_analysis(&analysis));
    Ok(())
}

/// Scan `dir` for session logs, print hour-of-day failure tables for each,
/// and export the aggregate as `{json_prefix}_hourly.json` alongside them.
pub fn run_patterns(dir: &Path, json_prefix: &str) -> Result<(), SessionError> {
    let logs = discover_logs(dir)?;

    println!("{BANNER}");
    println!("Hourly Failure Patterns");
    println!("{BANNER}");

    if logs.is_empty() {
        println!("No ping session logs found in {}", dir.display());
        return Ok(());
    }
    println!("Scanned {} log files in {}\n", logs.len(), dir.display());

    let mut sessions = Vec::new();
    for path in &logs {
        match read_log_file(path) {
            Ok(session) => {
                let label = format!("{} ({})", session.name, session.target);
                sessions.push((label, failure_timestamps(&session.samples)));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable log");
            }
        }
    }

    let patterns = aggregate_sessions(&sessions);
    for entry in &patterns {
        println!("Session: {}", entry.name);
        for line in render_hourly(&entry.pattern) {
            println!("{line}");
        }
        println!();
    }

    let total: usize = patterns.iter().map(|p| p.pattern.total_failures()).sum();
    println!("Total failures across sessions: {total}");

    let json_path = dir.join(format!("{}_hourly.json", json_prefix));
    let json = serde_json::to_string_pretty(&patterns)?;
    fs::write(&json_path, json)?;
    println!("Hourly pattern data written to {}", json_path.display());

    Ok(())
}
