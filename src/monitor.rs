//! Live monitoring sessions: continuous ping loops and periodic throughput
//! tests, both writing session logs and dashboard snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};

use crate::analysis::{analyze_session, ProbeSample, SessionAnalysis};
use crate::probe::{
    detect_default_gateway, measure_throughput, ping_target, query_time_offset, speed_insights,
    PingOutcome, SpeedStats, ThroughputConfig, ThroughputMeasurement, TimeSync,
};
use crate::report::{render_analysis, BANNER};
use crate::session::{
    host_name, now_wall, write_snapshot, PingLogWriter, SessionError, SessionSnapshot,
    SpeedLogWriter, SpeedSnapshot, TargetSnapshot, LOG_TIME_FORMAT,
};

/// Fallbacks when gateway detection fails: the usual home-router address
/// plus a public resolver.
const FALLBACK_GATEWAY: &str = "192.168.1.1";
const PUBLIC_DNS: &str = "8.8.8.8";

/// How many trailing samples each live snapshot carries for the dashboard.
const SNAPSHOT_SAMPLE_TAIL: usize = 120;

/// How often the live snapshot is rewritten while a session runs.
const SNAPSHOT_REFRESH: Duration = Duration::from_secs(30);

pub struct MonitorOptions {
    /// Explicit targets; empty means detect the gateway and add a resolver.
    pub targets: Vec<String>,
    pub interval_secs: f64,
    pub timeout_secs: f64,
    /// Stop after this many seconds; `None` runs until Ctrl+C.
    pub duration_secs: Option<u64>,
    pub run_name: Option<String>,
    pub data_dir: PathBuf,
}

pub struct ThroughputOptions {
    pub interval_secs: f64,
    pub duration_secs: Option<u64>,
    pub run_name: Option<String>,
    pub data_dir: PathBuf,
    pub config: ThroughputConfig,
}

struct ProbeEvent {
    target: String,
    timestamp: DateTime<Utc>,
    outcome: PingOutcome,
}

struct TargetSession {
    writer: PingLogWriter,
    samples: Vec<ProbeSample>,
}

struct SnapshotContext {
    run_name: String,
    host: String,
    data_dir: PathBuf,
    sync: Option<TimeSync>,
}

/// Run a continuous ping session against one or more targets until Ctrl+C
/// or the configured duration, then write summaries and a final snapshot.
pub async fn run_monitor(
    opts: MonitorOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&opts.data_dir)?;

    let sync = sync_clock().await;
    let started = stamped(&sync);
    let run_name = opts
        .run_name
        .clone()
        .unwrap_or_else(|| format!("netdrift_ping_{}", started.format("%Y%m%d_%H%M%S")));
    let host = host_name();
    let targets = resolve_targets(&opts.targets).await;

    println!("{BANNER}");
    println!("Ping Diagnostic Tool");
    println!("{BANNER}");
    println!("Computer Name: {host}");
    println!("Monitoring {} target(s):", targets.len());

    let mut sessions = BTreeMap::new();
    for target in &targets {
        let writer = PingLogWriter::create(
            &opts.data_dir,
            &run_name,
            &host,
            target,
            sync.as_ref(),
            started,
        )?;
        println!("  - {} -> {}", target, writer.path().display());
        sessions.insert(
            target.clone(),
            TargetSession {
                writer,
                samples: Vec::new(),
            },
        );
    }
    match opts.duration_secs {
        Some(secs) => println!("\nRunning for {secs}s; Ctrl+C stops earlier\n"),
        None => println!("\nPress Ctrl+C to stop\n"),
    }

    let interval_secs = if opts.interval_secs <= 0.0 {
        1.0
    } else {
        opts.interval_secs
    };
    let timeout = Duration::from_secs_f64(if opts.timeout_secs <= 0.0 {
        1.0
    } else {
        opts.timeout_secs
    });

    let (event_tx, event_rx) = mpsc::channel(1000);
    let (stop_tx, _) = broadcast::channel(1);

    for target in &targets {
        tokio::spawn(run_probe_loop(
            target.clone(),
            interval_secs,
            timeout,
            sync.clone(),
            event_tx.clone(),
            stop_tx.subscribe(),
        ));
    }
    drop(event_tx);

    let ctx = SnapshotContext {
        run_name: run_name.clone(),
        host: host.clone(),
        data_dir: opts.data_dir.clone(),
        sync: sync.clone(),
    };
    let writer_handle = tokio::spawn(run_session_writer(event_rx, sessions, ctx));

    wait_for_stop(opts.duration_secs).await?;
    let _ = stop_tx.send(());

    let mut sessions = writer_handle.await?;

    println!("\n{BANNER}");
    println!("Generating summary statistics...");
    let ended = stamped(&sync);
    let mut snapshots = Vec::new();
    for (target, session) in sessions.iter_mut() {
        let analysis = analyze_session(&session.samples);
        session.writer.finish(&analysis, ended)?;
        println!("\nTarget {target}");
        println!("{}", render_analysis(&analysis));
        println!("Log saved: {}", session.writer.path().display());
        snapshots.push(target_snapshot(target, session, &analysis));
    }

    let snapshot = SessionSnapshot {
        run_name: run_name.clone(),
        host,
        generated_at: ended,
        targets: snapshots,
    };
    let path = write_snapshot(&opts.data_dir, &run_name, &snapshot)?;
    tracing::info!("Session snapshot written to {}", path.display());

    Ok(())
}

/// Run periodic throughput measurements until Ctrl+C or the configured
/// duration, logging each round and keeping the dashboard snapshot fresh.
pub async fn run_throughput(
    opts: ThroughputOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&opts.data_dir)?;

    let sync = sync_clock().await;
    let started = stamped(&sync);
    let run_name = opts
        .run_name
        .clone()
        .unwrap_or_else(|| format!("netdrift_speedtest_{}", started.format("%Y%m%d_%H%M%S")));
    let host = host_name();

    let mut writer =
        SpeedLogWriter::create(&opts.data_dir, &run_name, &host, sync.as_ref(), started)?;

    let interval_secs = if opts.interval_secs <= 0.0 {
        300.0
    } else {
        opts.interval_secs
    };

    println!("{BANNER}");
    println!("Speed Test Diagnostic Tool");
    println!("{BANNER}");
    println!("Computer Name: {host}");
    println!("Log file: {}", writer.path().display());
    println!("Testing every {:.0}s; press Ctrl+C to stop\n", interval_secs);

    let client = reqwest::Client::builder()
        .timeout(opts.config.timeout)
        .build()?;

    let (stop_tx, mut stop_rx) = broadcast::channel(1);
    let duration_secs = opts.duration_secs;
    tokio::spawn(async move {
        if wait_for_stop(duration_secs).await.is_ok() {
            let _ = stop_tx.send(());
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs_f64(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut measurements: Vec<ThroughputMeasurement> = Vec::new();

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let m = measure_throughput(&client, &opts.config, stamped(&sync)).await;
                println!(
                    "[{}] {} Download: {:.2} Mbps | Upload: {:.2} Mbps | Ping: {:.1} ms",
                    m.timestamp.format(LOG_TIME_FORMAT),
                    m.status_label(),
                    m.download_mbps,
                    m.upload_mbps,
                    m.ping_ms,
                );
                if let Some(error) = &m.error {
                    tracing::warn!("Speed test round failed: {}", error);
                }
                if let Err(e) = writer.append(&m) {
                    tracing::error!("Failed to write speed test log line: {}", e);
                }
                measurements.push(m);
                if let Err(e) = flush_speed_snapshot(
                    &opts.data_dir,
                    &run_name,
                    &host,
                    &sync,
                    &measurements,
                    opts.config.low_speed_threshold_mbps,
                ) {
                    tracing::warn!("Live snapshot write failed: {}", e);
                }
            }
        }
    }

    let ended = stamped(&sync);
    writer.finish(&measurements, opts.config.low_speed_threshold_mbps, ended)?;
    println!("\nSummary statistics written to {}", writer.path().display());

    flush_speed_snapshot(
        &opts.data_dir,
        &run_name,
        &host,
        &sync,
        &measurements,
        opts.config.low_speed_threshold_mbps,
    )?;

    Ok(())
}

async fn sync_clock() -> Option<TimeSync> {
    match query_time_offset().await {
        Ok(sync) => {
            tracing::info!(
                "Clock synced against {} (offset {:.2}ms)",
                sync.server,
                sync.offset_ms()
            );
            Some(sync)
        }
        Err(e) => {
            tracing::warn!("NTP sync failed, timestamps use the local clock: {}", e);
            None
        }
    }
}

/// Current wall-clock reading, NTP-corrected when a sync is available.
fn stamped(sync: &Option<TimeSync>) -> DateTime<Utc> {
    let local = now_wall();
    match sync {
        Some(sync) => sync.adjust(local),
        None => local,
    }
}

async fn resolve_targets(requested: &[String]) -> Vec<String> {
    if !requested.is_empty() {
        return dedupe(requested.to_vec());
    }
    match detect_default_gateway().await {
        Some(gateway) => {
            tracing::info!("Detected default gateway: {}", gateway);
            dedupe(vec![gateway, PUBLIC_DNS.to_string()])
        }
        None => {
            tracing::warn!(
                "Could not detect gateway, using {} and {}",
                FALLBACK_GATEWAY,
                PUBLIC_DNS
            );
            vec![FALLBACK_GATEWAY.to_string(), PUBLIC_DNS.to_string()]
        }
    }
}

fn dedupe(targets: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    targets
        .into_iter()
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

async fn wait_for_stop(duration_secs: Option<u64>) -> std::io::Result<()> {
    match duration_secs {
        Some(secs) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result?,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::info!("Configured duration elapsed, stopping");
                }
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }
    Ok(())
}

async fn run_probe_loop(
    target: String,
    interval_secs: f64,
    timeout: Duration,
    sync: Option<TimeSync>,
    tx: mpsc::Sender<ProbeEvent>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    // Spread simultaneous targets out so their probes do not all fire in
    // the same instant.
    let jitter = rand::thread_rng().gen_range(0.0..interval_secs);
    tokio::time::sleep(Duration::from_secs_f64(jitter)).await;

    let mut interval = tokio::time::interval(Duration::from_secs_f64(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let timestamp = stamped(&sync);
                let outcome = ping_target(&target, timeout).await;
                let event = ProbeEvent {
                    target: target.clone(),
                    timestamp,
                    outcome,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Single consumer of probe events: appends log lines, accumulates samples,
/// and refreshes the live snapshot on a timer. Returns the sessions for
/// finalization once every probe loop has hung up.
async fn run_session_writer(
    mut rx: mpsc::Receiver<ProbeEvent>,
    mut sessions: BTreeMap<String, TargetSession>,
    ctx: SnapshotContext,
) -> BTreeMap<String, TargetSession> {
    let mut refresh = tokio::time::interval(SNAPSHOT_REFRESH);
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        if let Some(session) = sessions.get_mut(&event.target) {
                            session.samples.push(ProbeSample::new(
                                event.timestamp,
                                event.outcome.status,
                                event.outcome.latency_ms,
                            ));
                            if let Err(e) = session.writer.append(event.timestamp, &event.outcome) {
                                tracing::error!("Failed to write {} log line: {}", event.target, e);
                            }
                        }
                    }
                    None => break,
                }
            }
            _ = refresh.tick() => {
                if let Err(e) = flush_live_snapshot(&ctx, &mut sessions) {
                    tracing::warn!("Live snapshot write failed: {}", e);
                }
            }
        }
    }

    // One more flush so the snapshot reflects everything received before
    // the probe loops hung up.
    if let Err(e) = flush_live_snapshot(&ctx, &mut sessions) {
        tracing::warn!("Live snapshot write failed: {}", e);
    }

    sessions
}

fn flush_live_snapshot(
    ctx: &SnapshotContext,
    sessions: &mut BTreeMap<String, TargetSession>,
) -> Result<(), SessionError> {
    let mut targets = Vec::new();
    for (target, session) in sessions.iter_mut() {
        let analysis = analyze_session(&session.samples);
        targets.push(target_snapshot(target, session, &analysis));
    }
    let snapshot = SessionSnapshot {
        run_name: ctx.run_name.clone(),
        host: ctx.host.clone(),
        generated_at: stamped(&ctx.sync),
        targets,
    };
    write_snapshot(&ctx.data_dir, &ctx.run_name, &snapshot)?;
    Ok(())
}

fn target_snapshot(
    target: &str,
    session: &mut TargetSession,
    analysis: &SessionAnalysis,
) -> TargetSnapshot {
    let tail_start = session.samples.len().saturating_sub(SNAPSHOT_SAMPLE_TAIL);
    TargetSnapshot {
        target: target.to_string(),
        log_file: session
            .writer
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        metrics: analysis.metrics.clone(),
        insights: analysis.insights.clone(),
        latency: session.writer.latency_summary(),
        recent_samples: session.samples[tail_start..].to_vec(),
    }
}

fn flush_speed_snapshot(
    data_dir: &std::path::Path,
    run_name: &str,
    host: &str,
    sync: &Option<TimeSync>,
    measurements: &[ThroughputMeasurement],
    threshold_mbps: f64,
) -> Result<(), SessionError> {
    let downloads: Vec<f64> = measurements
        .iter()
        .filter(|m| m.ok)
        .map(|m| m.download_mbps)
        .collect();
    let uploads: Vec<f64> = measurements
        .iter()
        .filter(|m| m.ok)
        .map(|m| m.upload_mbps)
        .collect();
    let download = SpeedStats::of(&downloads);
    let upload = SpeedStats::of(&uploads);

    let snapshot = SpeedSnapshot {
        run_name: run_name.to_string(),
        host: host.to_string(),
        generated_at: stamped(sync),
        download,
        upload,
        insights: speed_insights(&download, &upload, threshold_mbps),
        measurements: measurements.to_vec(),
    };
    write_snapshot(data_dir, run_name, &snapshot)?;
    Ok(())
}
