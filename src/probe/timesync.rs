//! SNTP clock-offset probe.
//!
//! One mode-3 client packet per server, transmit timestamp read from the
//! reply. Good to a few milliseconds, which is all the cross-machine log
//! correlation needs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;

use super::ProbeError;

/// Servers tried in order until one answers.
pub const NTP_SERVERS: [&str; 3] = ["pool.ntp.org", "time.google.com", "time.cloudflare.com"];

const NTP_PORT: u16 = 123;
const SNTP_PACKET_LEN: usize = 48;
/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_EPOCH_DELTA: u64 = 2_208_988_800;
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of a successful clock-offset query.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSync {
    /// Server that answered.
    pub server: String,
    /// Local clock minus server clock, in seconds. Positive means the local
    /// clock runs ahead.
    pub offset_secs: f64,
}

impl TimeSync {
    pub fn offset_ms(&self) -> f64 {
        self.offset_secs * 1000.0
    }

    /// Shift a local reading onto the server's clock.
    pub fn adjust(&self, local: DateTime<Utc>) -> DateTime<Utc> {
        local - chrono::Duration::microseconds((self.offset_secs * 1e6).round() as i64)
    }
}

/// Query the clock offset, walking the server list until one answers.
pub async fn query_time_offset() -> Result<TimeSync, ProbeError> {
    let mut last_err = ProbeError::Network("no NTP servers configured".to_string());

    for server in NTP_SERVERS {
        match query_server(server, QUERY_TIMEOUT).await {
            Ok(offset_secs) => {
                return Ok(TimeSync {
                    server: server.to_string(),
                    offset_secs,
                })
            }
            Err(e) => {
                tracing::debug!("NTP query to {} failed: {}", server, e);
                last_err = e;
            }
        }
    }

    Err(last_err)
}

async fn query_server(server: &str, timeout: Duration) -> Result<f64, ProbeError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| ProbeError::Network(format!("failed to bind UDP socket: {}", e)))?;
    socket
        .connect((server, NTP_PORT))
        .await
        .map_err(|e| ProbeError::Network(format!("failed to reach {}: {}", server, e)))?;

    // LI=0, VN=3, Mode=3 (client); everything else zero.
    let mut request = [0u8; SNTP_PACKET_LEN];
    request[0] = 0x1B;
    socket
        .send(&request)
        .await
        .map_err(|e| ProbeError::Network(format!("failed to send to {}: {}", server, e)))?;

    let mut response = [0u8; SNTP_PACKET_LEN];
    let len = tokio::time::timeout(timeout, socket.recv(&mut response))
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
        .map_err(|e| ProbeError::Network(format!("failed to receive from {}: {}", server, e)))?;
    let local_time = Utc::now();

    if len < SNTP_PACKET_LEN {
        return Err(ProbeError::Protocol(format!(
            "short NTP response: {} bytes",
            len
        )));
    }
    let mode = response[0] & 0x07;
    if mode != 4 {
        return Err(ProbeError::Protocol(format!("unexpected NTP mode {}", mode)));
    }

    let server_time = parse_transmit_timestamp(&response)?;
    Ok((local_time - server_time).num_milliseconds() as f64 / 1000.0)
}

/// Decode the transmit timestamp (bytes 40..48): 32-bit seconds since 1900
/// plus a 32-bit binary fraction.
fn parse_transmit_timestamp(packet: &[u8; SNTP_PACKET_LEN]) -> Result<DateTime<Utc>, ProbeError> {
    let secs = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]) as u64;
    let frac = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]) as u64;

    if secs < NTP_UNIX_EPOCH_DELTA {
        return Err(ProbeError::Protocol(
            "transmit timestamp predates the unix epoch".to_string(),
        ));
    }

    let unix_secs = (secs - NTP_UNIX_EPOCH_DELTA) as i64;
    let nanos = ((frac * 1_000_000_000) >> 32) as u32;
    DateTime::from_timestamp(unix_secs, nanos)
        .ok_or_else(|| ProbeError::Protocol("transmit timestamp out of range".to_string()))
}
