//! HTTP request handlers.

use super::AppState;
use crate::session::now_wall;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");

/// Dashboard refresh cadence pushed into the page template.
const REFRESH_SECS: u32 = 10;

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let page = DASHBOARD_TEMPLATE
        .replace("{{refresh_secs}}", &REFRESH_SECS.to_string())
        .replace("{{data_dir}}", &state.config.data_dir.display().to_string());

    Html(page)
}

// ============================================================================
// API: snapshot data
// ============================================================================

pub async fn handle_data(State(state): State<AppState>) -> impl IntoResponse {
    let ping = latest_snapshot(&state.config.data_dir, "_ping_");
    let speedtest = latest_snapshot(&state.config.data_dir, "_speedtest_");

    Json(json!({
        "ping": ping,
        "speedtest": speedtest,
        "timestamp": now_wall().to_rfc3339(),
    }))
}

pub async fn handle_ping_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(latest_snapshot(&state.config.data_dir, "_ping_").unwrap_or_else(|| json!({})))
}

pub async fn handle_speedtest_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(latest_snapshot(&state.config.data_dir, "_speedtest_").unwrap_or_else(|| json!({})))
}

/// Parsed content of the most recent `*{marker}*.json` under `dir`, `None`
/// when no file matches or the newest one does not parse.
fn latest_snapshot(dir: &Path, marker: &str) -> Option<Value> {
    let path = newest_matching(dir, marker)?;
    let content = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

fn newest_matching(dir: &Path, marker: &str) -> Option<PathBuf> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir).ok()?.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(marker) || !name.ends_with(".json") {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) {
            if newest.as_ref().map_or(true, |(time, _)| modified > *time) {
                newest = Some((modified, entry.path()));
            }
        }
    }

    newest.map(|(_, path)| path)
}

// ============================================================================
// Static Assets
// ============================================================================

pub async fn handle_favicon() -> impl IntoResponse {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <circle cx="50" cy="50" r="45" fill="#2f855a"/>
        <path d="M20 55 L35 55 L45 30 L55 75 L65 55 L80 55" stroke="white" stroke-width="5" fill="none"/>
    </svg>"##;

    ([(axum::http::header::CONTENT_TYPE, "image/svg+xml")], svg)
}
