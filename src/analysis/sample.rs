//! Probe sample types shared by the collector and the analysis engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single connectivity check, as classified by the collector.
///
/// The engine never sees raw command output; the collector normalizes every
/// probe into one of these variants before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Timeout,
    Unreachable,
    Unknown,
    Error,
}

impl ProbeStatus {
    /// Whether this status starts or extends a disruption cluster.
    ///
    /// Only `Timeout` does. A timeout is a missed probe, which is what a
    /// cluster models; `Unreachable`, `Unknown`, and `Error` prove the probe
    /// ran and produced a different failure mode, so they close a running
    /// cluster instead of extending it.
    pub fn is_disruption(self) -> bool {
        matches!(self, ProbeStatus::Timeout)
    }

    /// Uppercase form used in log lines.
    pub fn as_log_str(self) -> &'static str {
        match self {
            ProbeStatus::Success => "SUCCESS",
            ProbeStatus::Timeout => "TIMEOUT",
            ProbeStatus::Unreachable => "UNREACHABLE",
            ProbeStatus::Unknown => "UNKNOWN",
            ProbeStatus::Error => "ERROR",
        }
    }

    /// Parse the uppercase log form; anything unrecognized maps to `Unknown`.
    pub fn from_log_str(s: &str) -> Self {
        match s.trim() {
            "SUCCESS" => ProbeStatus::Success,
            "TIMEOUT" => ProbeStatus::Timeout,
            "UNREACHABLE" => ProbeStatus::Unreachable,
            "ERROR" => ProbeStatus::Error,
            _ => ProbeStatus::Unknown,
        }
    }
}

/// One timestamped connectivity check result for a single target.
///
/// Samples arrive ordered by timestamp non-decreasing; duplicate timestamps
/// are legal input and must not break any analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    pub timestamp: DateTime<Utc>,
    pub status: ProbeStatus,
    /// Round-trip latency in milliseconds, present for successful probes.
    pub latency_ms: Option<f64>,
}

impl ProbeSample {
    pub fn new(timestamp: DateTime<Utc>, status: ProbeStatus, latency_ms: Option<f64>) -> Self {
        Self {
            timestamp,
            status,
            latency_ms,
        }
    }

    pub fn is_disruption(&self) -> bool {
        self.status.is_disruption()
    }
}
