//! Session log writing, reading, and live latency tracking.

mod latency;
mod reader;
mod writer;

pub use latency::*;
pub use reader::*;
pub use writer::*;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Session log error types.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Current wall-clock reading with the zone dropped.
///
/// Log files carry local wall-clock timestamps (that is what a person
/// correlating outages against their day expects), so the whole pipeline
/// works in naive local time surfaced as `DateTime<Utc>`. Deltas and
/// hour-of-day math are unaffected.
pub fn now_wall() -> DateTime<Utc> {
    chrono::Local::now().naive_local().and_utc()
}

/// Hostname of this machine, for log headers.
pub fn host_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
