//! Ping probe via the system ping command.
//!
//! One probe spawns one `ping` invocation and classifies its text output.
//! Exit codes are ignored because platforms disagree on them; the text is
//! the contract.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use crate::analysis::ProbeStatus;

/// Slack past the ping deadline before the command itself is given up on.
const COMMAND_GRACE: Duration = Duration::from_secs(4);

/// Classified result of one ping invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PingOutcome {
    pub status: ProbeStatus,
    pub latency_ms: Option<f64>,
    pub ttl: Option<u32>,
}

impl PingOutcome {
    pub(crate) fn bare(status: ProbeStatus) -> Self {
        Self {
            status,
            latency_ms: None,
            ttl: None,
        }
    }
}

/// Ping `address` once and classify the outcome.
///
/// Never fails: a spawn problem comes back as `ProbeStatus::Error`, an
/// overrunning command as `ProbeStatus::Timeout`.
pub async fn ping_target(address: &str, timeout: Duration) -> PingOutcome {
    let mut cmd = ping_command(address, timeout);

    match tokio::time::timeout(timeout + COMMAND_GRACE, cmd.output()).await {
        Err(_) => PingOutcome::bare(ProbeStatus::Timeout),
        Ok(Err(e)) => {
            tracing::warn!("failed to execute ping for {}: {}", address, e);
            PingOutcome::bare(ProbeStatus::Error)
        }
        Ok(Ok(output)) => classify_ping_output(&String::from_utf8_lossy(&output.stdout)),
    }
}

#[cfg(target_os = "windows")]
fn ping_command(address: &str, timeout: Duration) -> Command {
    let timeout_ms = timeout.as_millis().max(1);
    let mut cmd = Command::new("ping");
    cmd.args(["-n", "1", "-w", &timeout_ms.to_string(), address])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

#[cfg(not(target_os = "windows"))]
fn ping_command(address: &str, timeout: Duration) -> Command {
    let timeout_secs = timeout.as_secs().max(1);
    let mut cmd = Command::new("ping");
    cmd.args(["-c", "1", "-W", &timeout_secs.to_string(), address])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Classify raw ping output into a status plus latency and TTL.
///
/// A reply must carry a `time=`/`time<` figure to count as success; the
/// Windows "Reply from x: Destination host unreachable" form therefore
/// falls through to the unreachable branch instead of passing as a reply.
pub fn classify_ping_output(output: &str) -> PingOutcome {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    static TTL_RE: OnceLock<Regex> = OnceLock::new();
    let time_re = TIME_RE.get_or_init(|| Regex::new(r"time[=<]([0-9.]+)\s*ms").unwrap());
    let ttl_re = TTL_RE.get_or_init(|| Regex::new(r"(?i)ttl=(\d+)").unwrap());

    if let Some(caps) = time_re.captures(output) {
        let latency_ms = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let ttl = ttl_re
            .captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        return PingOutcome {
            status: ProbeStatus::Success,
            latency_ms,
            ttl,
        };
    }

    let lower = output.to_lowercase();
    if lower.contains("unreachable") {
        return PingOutcome::bare(ProbeStatus::Unreachable);
    }
    if lower.contains("timed out")
        || lower.contains("100% packet loss")
        || lower.contains("100.0% packet loss")
    {
        return PingOutcome::bare(ProbeStatus::Timeout);
    }

    PingOutcome::bare(ProbeStatus::Unknown)
}
