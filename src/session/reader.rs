//! Reads session logs back into samples for offline analysis.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::writer::LOG_TIME_FORMAT;
use super::SessionError;
use crate::analysis::{ProbeSample, ProbeStatus};

/// One parsed log file.
#[derive(Debug, Clone)]
pub struct LogSession {
    /// Run name from the header, or the file stem when the header is missing.
    pub name: String,
    /// Target address from the header, or `"unknown"`.
    pub target: String,
    pub path: PathBuf,
    pub samples: Vec<ProbeSample>,
}

/// Find ping session logs under `dir`, sorted by file name.
///
/// Matches any `*.txt` whose name contains `_ping_`, case-insensitively, so
/// logs produced by older runs with different prefixes still show up.
pub fn discover_logs(dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let name_re = NAME_RE.get_or_init(|| Regex::new(r"(?i)^.*_ping_.*\.txt$").unwrap());

    if !dir.is_dir() {
        return Err(SessionError::NotADirectory(dir.display().to_string()));
    }

    let mut logs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        if name_re.is_match(&file_name.to_string_lossy()) {
            logs.push(entry.path());
        }
    }
    logs.sort();
    Ok(logs)
}

/// Parse one session log into its header fields and samples.
///
/// Lines that do not look like probe records (headers, footers, partial
/// writes from a killed session) are skipped rather than failing the file.
pub fn read_log_file(path: &Path) -> Result<LogSession, SessionError> {
    static RUN_NAME_RE: OnceLock<Regex> = OnceLock::new();
    static TARGET_RE: OnceLock<Regex> = OnceLock::new();
    let run_name_re = RUN_NAME_RE.get_or_init(|| Regex::new(r"Run Name:\s+(.+)").unwrap());
    let target_re = TARGET_RE.get_or_init(|| Regex::new(r"Target IP:\s+([\d.]+)").unwrap());

    let content = fs::read_to_string(path)?;
    let mut name = None;
    let mut target = None;
    let mut samples = Vec::new();

    for line in content.lines() {
        if name.is_none() {
            if let Some(caps) = run_name_re.captures(line) {
                name = Some(caps[1].trim().to_string());
                continue;
            }
        }
        if target.is_none() {
            if let Some(caps) = target_re.captures(line) {
                target = Some(caps[1].to_string());
                continue;
            }
        }
        if let Some(sample) = parse_log_line(line) {
            samples.push(sample);
        }
    }

    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    });

    Ok(LogSession {
        name,
        target: target.unwrap_or_else(|| "unknown".to_string()),
        path: path.to_path_buf(),
        samples,
    })
}

fn parse_log_line(line: &str) -> Option<ProbeSample> {
    static STAMP_RE: OnceLock<Regex> = OnceLock::new();
    static STATUS_RE: OnceLock<Regex> = OnceLock::new();
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let stamp_re = STAMP_RE
        .get_or_init(|| Regex::new(r"\[(\d{4}-\d{2}-\d{2})\s+(\d{2}:\d{2}:\d{2}\.\d{3})\]").unwrap());
    let status_re = STATUS_RE.get_or_init(|| Regex::new(r"Status:\s+([A-Za-z]+)").unwrap());
    let time_re = TIME_RE.get_or_init(|| Regex::new(r"Time:\s+([\d.]+)ms").unwrap());

    let stamp_caps = stamp_re.captures(line)?;
    let status_caps = status_re.captures(line)?;

    let stamp = format!("{} {}", &stamp_caps[1], &stamp_caps[2]);
    let timestamp = NaiveDateTime::parse_from_str(&stamp, LOG_TIME_FORMAT)
        .ok()?
        .and_utc();
    let status = ProbeStatus::from_log_str(&status_caps[1]);
    let latency_ms = time_re
        .captures(line)
        .and_then(|caps| caps[1].parse::<f64>().ok());

    Some(ProbeSample::new(timestamp, status, latency_ms))
}
