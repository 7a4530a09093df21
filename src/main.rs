//! lanwatch — LAN discovery and monitoring CLI
//!
//! Thin presentation surface over the library core: scan a range, watch
//! selected hosts with threshold alerting, or list usable interfaces.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lanwatch::{
    enumerate_hosts, find_valid_interface, list_valid_interfaces, run_scan, AlertEvaluator,
    AlertSender, AlertSettings, CancelToken, DeviceContext, MonitorRegistry, MonitorSettings,
    NotificationDispatcher, ProbeStack, ProgressCallback, SampleCallback, ScanOptions, ScanReport,
};

#[derive(Debug, PartialEq)]
enum CliCommand {
    Scan {
        range: Option<String>,
        concurrency: usize,
        json: bool,
    },
    Monitor {
        targets: Vec<Ipv4Addr>,
        interval_secs: u64,
        latency_threshold_ms: f64,
        consecutive_failures: u32,
        cooldown_minutes: u64,
        batch: bool,
        batch_interval_minutes: u64,
    },
    Interfaces,
    Help,
    Version,
}

fn version_text() -> String {
    format!("lanwatch {}", env!("CARGO_PKG_VERSION"))
}

fn usage_text() -> String {
    format!(
        "{version}
lanwatch — LAN discovery and monitoring CLI

Usage:
  lanwatch scan [--range <CIDR>] [--concurrency <N>] [--json]
  lanwatch monitor <IP>... [--interval <SECS>] [--threshold <MS>]
                   [--failures <N>] [--cooldown <MINS>]
                   [--batch] [--batch-interval <MINS>]
  lanwatch interfaces
  lanwatch --help
  lanwatch --version

Options:
  -r, --range <CIDR>        Range to scan (default: local interface subnet)
      --concurrency <N>     Concurrent probes per scan (default: 64)
      --json                Emit the scan report as JSON
      --interval <SECS>     Seconds between monitoring ticks (default: 2)
      --threshold <MS>      High-latency ceiling in ms (default: 1000)
      --failures <N>        Consecutive failures before alerting (default: 3)
      --cooldown <MINS>     Minutes between alerts per host (default: 5)
      --batch               Batch alerts into grouped notifications
      --batch-interval <MINS>  Batch accumulation window (default: 15)
  -h, --help                Show this help text
  -V, --version             Show version",
        version = version_text(),
    )
}

fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let mut iter = args.iter();

    let Some(first) = iter.next() else {
        return Ok(CliCommand::Help);
    };

    fn take_value<'a>(
        iter: &mut std::slice::Iter<'a, String>,
        flag: &str,
    ) -> Result<&'a String, String> {
        iter.next().ok_or_else(|| format!("{flag} requires a value"))
    }

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(CliCommand::Help),
        "-V" | "--version" | "version" => Ok(CliCommand::Version),
        "interfaces" => Ok(CliCommand::Interfaces),
        "scan" => {
            let mut range = None;
            let mut concurrency = lanwatch::config::DEFAULT_SCAN_CONCURRENCY;
            let mut json = false;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "-r" | "--range" => range = Some(take_value(&mut iter, arg)?.clone()),
                    "--concurrency" => {
                        concurrency = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--concurrency expects a positive integer".to_string())?;
                    }
                    "--json" => json = true,
                    other => return Err(format!("unknown scan option: {other}")),
                }
            }
            Ok(CliCommand::Scan {
                range,
                concurrency,
                json,
            })
        }
        "monitor" => {
            let mut targets = Vec::new();
            let mut interval_secs = 2;
            let mut latency_threshold_ms = 1000.0;
            let mut consecutive_failures = 3;
            let mut cooldown_minutes = 5;
            let mut batch = false;
            let mut batch_interval_minutes = 15;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--interval" => {
                        interval_secs = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--interval expects seconds".to_string())?;
                    }
                    "--threshold" => {
                        latency_threshold_ms = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--threshold expects milliseconds".to_string())?;
                    }
                    "--failures" => {
                        consecutive_failures = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--failures expects a count".to_string())?;
                    }
                    "--cooldown" => {
                        cooldown_minutes = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--cooldown expects minutes".to_string())?;
                    }
                    "--batch" => batch = true,
                    "--batch-interval" => {
                        batch_interval_minutes = take_value(&mut iter, arg)?
                            .parse()
                            .map_err(|_| "--batch-interval expects minutes".to_string())?;
                    }
                    other => {
                        let ip = other
                            .parse::<Ipv4Addr>()
                            .map_err(|_| format!("not an address or option: {other}"))?;
                        targets.push(ip);
                    }
                }
            }
            if targets.is_empty() {
                return Err("monitor requires at least one address".to_string());
            }
            Ok(CliCommand::Monitor {
                targets,
                interval_secs,
                latency_threshold_ms,
                consecutive_failures,
                cooldown_minutes,
                batch,
                batch_interval_minutes,
            })
        }
        other => Err(format!("unknown command: {other}")),
    }
}

/// Sender used by the CLI: composed notifications go to stdout and the
/// log instead of a real transport.
struct ConsoleSender;

impl AlertSender for ConsoleSender {
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
        tracing::info!("delivering '{}' to {:?}", subject, recipients);
        println!("\n=== {subject} ===\n{body}");
        Ok(())
    }
}

async fn cmd_scan(range: Option<String>, concurrency: usize, json: bool) -> Result<()> {
    let interface = find_valid_interface().ok();
    if let Some(iface) = &interface {
        tracing::info!("using interface {} ({}/{})", iface.name, iface.ip, iface.prefix_len);
    } else {
        tracing::warn!("no usable interface; layer-2 discovery disabled");
    }

    let range = match range {
        Some(range) => range,
        None => {
            let iface = interface.as_ref().ok_or_else(|| {
                lanwatch::LanwatchError::Interface(
                    "no usable interface and no --range given".to_string(),
                )
            })?;
            format!("{}/{}", iface.ip, iface.prefix_len)
        }
    };

    let targets = enumerate_hosts(&range)?;
    let total = targets.len();
    tracing::info!("scanning {} hosts in {}", total, range);

    let stack = Arc::new(ProbeStack::new(interface.as_ref()));
    let progress: ProgressCallback = Arc::new(|percent| {
        eprint!("\rscan progress: {percent:3}%");
        if percent == 100 {
            eprintln!();
        }
    });

    let started = Instant::now();
    let scan_stack = Arc::clone(&stack);
    let devices = run_scan(
        targets,
        &ScanOptions { concurrency },
        move |ip| {
            let stack = Arc::clone(&scan_stack);
            async move { stack.probe_device(ip).await }
        },
        None,
        Some(progress),
        CancelToken::new(),
    )
    .await;

    let report = ScanReport {
        range,
        scanned: total,
        found: devices.len(),
        duration_ms: started.elapsed().as_millis() as u64,
        devices,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} of {} hosts responded in {}ms",
            report.found, report.scanned, report.duration_ms
        );
        for device in &report.devices {
            println!(
                "{:<15} {:<17} {:<10} {:<24} {}",
                device.ip.to_string(),
                device.mac.as_deref().unwrap_or("-"),
                device
                    .response_time_ms
                    .map(|ms| format!("{ms:.1}ms"))
                    .unwrap_or_else(|| "-".to_string()),
                device.hostname,
                device.vendor,
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_monitor(
    targets: Vec<Ipv4Addr>,
    interval_secs: u64,
    latency_threshold_ms: f64,
    consecutive_failures: u32,
    cooldown_minutes: u64,
    batch: bool,
    batch_interval_minutes: u64,
) -> Result<()> {
    let alert_settings = AlertSettings {
        latency_threshold_ms,
        consecutive_failures,
        cooldown: Duration::from_secs(cooldown_minutes * 60),
        batch_alerts: batch,
        batch_interval: Duration::from_secs(batch_interval_minutes * 60),
        recipients: vec!["console".to_string()],
        ..Default::default()
    };
    alert_settings.validate()?;

    let interface = find_valid_interface().ok();
    let stack = Arc::new(ProbeStack::new(interface.as_ref()));

    // One enrichment pass up front so alerts carry device identity.
    let mut contexts: HashMap<Ipv4Addr, DeviceContext> = HashMap::new();
    for &ip in &targets {
        if let Some(record) = stack.probe_device(ip).await {
            contexts.insert(ip, DeviceContext::from_record(&record));
        }
    }
    let contexts = Arc::new(contexts);

    let evaluator = Arc::new(AlertEvaluator::new(alert_settings.clone())?);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        alert_settings,
        Arc::new(ConsoleSender),
    ));

    let on_sample: SampleCallback = {
        let evaluator = Arc::clone(&evaluator);
        let dispatcher = Arc::clone(&dispatcher);
        let contexts = Arc::clone(&contexts);
        Arc::new(move |ip, latency_ms, status, timestamp| {
            println!(
                "{} {:<15} {:<4} {}",
                timestamp.format("%H:%M:%S"),
                ip.to_string(),
                status.as_str(),
                latency_ms
                    .map(|ms| format!("{ms:.1}ms"))
                    .unwrap_or_else(|| "-".to_string()),
            );
            let sample = lanwatch::Sample::new(timestamp, latency_ms, status);
            let context = contexts.get(&ip).cloned().unwrap_or_default();
            if let Some(event) = evaluator.evaluate(ip, &sample, &context) {
                dispatcher.dispatch(event);
            }
        })
    };

    let mut registry = MonitorRegistry::new(MonitorSettings {
        interval: Duration::from_secs(interval_secs.max(1)),
        ..Default::default()
    });
    for &ip in &targets {
        registry.start(ip, stack.liveness_probe(), Some(on_sample.clone()), None);
    }
    tracing::info!("monitoring {} host(s); ctrl-c to stop", registry.len());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutting down");
    registry.stop_all().await;
    dispatcher.clear();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    match &command {
        CliCommand::Help => {
            println!("{}", usage_text());
            return Ok(());
        }
        CliCommand::Version => {
            println!("{}", version_text());
            return Ok(());
        }
        _ => {}
    }

    if let Err(e) = lanwatch::logging::init_logging() {
        eprintln!("warning: logging unavailable: {e}");
    }

    match command {
        CliCommand::Scan {
            range,
            concurrency,
            json,
        } => cmd_scan(range, concurrency, json).await,
        CliCommand::Monitor {
            targets,
            interval_secs,
            latency_threshold_ms,
            consecutive_failures,
            cooldown_minutes,
            batch,
            batch_interval_minutes,
        } => {
            cmd_monitor(
                targets,
                interval_secs,
                latency_threshold_ms,
                consecutive_failures,
                cooldown_minutes,
                batch,
                batch_interval_minutes,
            )
            .await
        }
        CliCommand::Interfaces => {
            for name in list_valid_interfaces() {
                println!("{name}");
            }
            Ok(())
        }
        CliCommand::Help | CliCommand::Version => unreachable!(),
    }
}
