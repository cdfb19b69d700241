//! Configuration module for netdrift.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for the dashboard server (default: 5000)
    pub http_port: u16,
    /// Directory where session logs and snapshots land (default: "data")
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 5000,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `NETDRIFT_HTTP_PORT`: dashboard port (default: 5000)
    /// - `NETDRIFT_DATA_DIR`: output directory (default: "data")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("NETDRIFT_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(data_dir) = env::var("NETDRIFT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(data_dir);
        }

        cfg
    }
}
