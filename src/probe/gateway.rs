//! Default-gateway discovery via the OS routing table.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use super::ProbeError;

const ROUTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Detect the default gateway address, if the routing table names one.
pub async fn detect_default_gateway() -> Option<String> {
    match query_routing_table().await {
        Ok(output) => parse_gateway(&output),
        Err(e) => {
            tracing::debug!("gateway detection failed: {}", e);
            None
        }
    }
}

#[cfg(target_os = "windows")]
async fn query_routing_table() -> Result<String, ProbeError> {
    run_route_command("route", &["print", "0.0.0.0"]).await
}

#[cfg(not(target_os = "windows"))]
async fn query_routing_table() -> Result<String, ProbeError> {
    run_route_command("ip", &["route", "show", "default"]).await
}

async fn run_route_command(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = tokio::time::timeout(
        ROUTE_TIMEOUT,
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ProbeError::Timeout(ROUTE_TIMEOUT))?
    .map_err(|e| ProbeError::Command(format!("failed to execute {}: {}", program, e)))?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Pull the gateway IP out of `route print` or `ip route` output.
pub fn parse_gateway(output: &str) -> Option<String> {
    static IP_RE: OnceLock<Regex> = OnceLock::new();
    let ip_re = IP_RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").unwrap());

    for line in output.lines() {
        // `ip route`: "default via 192.168.1.1 dev eth0"
        if let Some(rest) = line.trim().strip_prefix("default via ") {
            if let Some(gw) = rest.split_whitespace().next() {
                if ip_re.is_match(gw) {
                    return Some(gw.to_string());
                }
            }
        }

        // `route print`: the gateway sits two columns after the 0.0.0.0
        // destination; "On-link" rows have no gateway.
        if line.contains("0.0.0.0") && !line.contains("On-link") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            for (i, part) in parts.iter().enumerate() {
                if *part == "0.0.0.0" && i + 2 < parts.len() && ip_re.is_match(parts[i + 2]) {
                    return Some(parts[i + 2].to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip_route_output() {
        let output = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n";
        assert_eq!(parse_gateway(output), Some("192.168.1.1".to_string()));
    }

    #[test]
    fn test_parse_route_print_output() {
        let output = r#"
IPv4 Route Table
===========================================================================
Active Routes:
Network Destination        Netmask          Gateway       Interface  Metric
          0.0.0.0          0.0.0.0      192.168.4.1     192.168.4.26     55
===========================================================================
"#;
        assert_eq!(parse_gateway(output), Some("192.168.4.1".to_string()));
    }

    #[test]
    fn test_on_link_rows_are_skipped() {
        let output = "          0.0.0.0          0.0.0.0          On-link      192.168.4.26     55";
        assert_eq!(parse_gateway(output), None);
    }

    #[test]
    fn test_empty_table_yields_none() {
        assert_eq!(parse_gateway(""), None);
        assert_eq!(parse_gateway("no default route\n"), None);
    }
}
