//! Network probes: ping, default-gateway discovery, SNTP clock offset,
//! and HTTP throughput.

mod gateway;
mod ping;
mod throughput;
mod timesync;

pub use gateway::*;
pub use ping::*;
pub use throughput::*;
pub use timesync::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
}
