//! Per-device liveness monitoring
//!
//! One supervised task per monitored address, polling the liveness
//! portion of the probe chain at a fixed interval and appending samples
//! to a bounded history. Stopping is cooperative with a bounded join;
//! a monitor that fails to join in time is logged as leaked, never
//! propagated.

mod history;

pub use history::HistoryBuffer;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{MonitorSettings, MONITOR_JOIN_TIMEOUT};
use crate::models::{Sample, SampleStatus};
use crate::probe::LivenessProbeFn;

/// Slice length for interval waits, bounding how long stop can lag
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Per-sample status callback: (address, latency, status, timestamp)
pub type SampleCallback =
    Arc<dyn Fn(Ipv4Addr, Option<f64>, SampleStatus, DateTime<Utc>) + Send + Sync>;

/// Buffer-snapshot callback for trend consumers: (address, full buffer)
pub type HistoryCallback = Arc<dyn Fn(Ipv4Addr, Vec<Sample>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

/// Long-lived polling loop for one address
pub struct DeviceMonitor {
    ip: Ipv4Addr,
    settings: MonitorSettings,
    state: MonitorState,
    running: Arc<AtomicBool>,
    history: Arc<Mutex<HistoryBuffer>>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceMonitor {
    pub fn new(ip: Ipv4Addr, settings: MonitorSettings) -> Self {
        let capacity = settings.history_capacity;
        Self {
            ip,
            settings,
            state: MonitorState::Idle,
            running: Arc::new(AtomicBool::new(false)),
            history: Arc::new(Mutex::new(HistoryBuffer::new(capacity))),
            handle: None,
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    pub async fn history_snapshot(&self) -> Vec<Sample> {
        self.history.lock().await.snapshot()
    }

    /// Transitions Idle → Running and spawns the polling loop. Starting
    /// anything but an idle monitor is a no-op.
    pub fn start(
        &mut self,
        probe: LivenessProbeFn,
        on_sample: Option<SampleCallback>,
        on_history: Option<HistoryCallback>,
    ) {
        if self.state != MonitorState::Idle {
            tracing::debug!("monitor for {} already {:?}; start ignored", self.ip, self.state);
            return;
        }

        self.running.store(true, Ordering::Relaxed);
        self.state = MonitorState::Running;

        let ip = self.ip;
        let interval = self.settings.interval;
        let running = Arc::clone(&self.running);
        let history = Arc::clone(&self.history);

        self.handle = Some(tokio::spawn(async move {
            tracing::debug!("monitor loop started for {} (interval {:?})", ip, interval);

            while running.load(Ordering::Relaxed) {
                // Each tick runs as its own task so an unexpected panic in
                // a probe or callback is caught here and the loop survives.
                let tick = tokio::spawn(monitor_tick(
                    ip,
                    probe.clone(),
                    Arc::clone(&history),
                    on_sample.clone(),
                    on_history.clone(),
                ));
                if let Err(e) = tick.await {
                    tracing::error!("monitor tick failed for {}: {}", ip, e);
                }

                let mut remaining = interval;
                while !remaining.is_zero() && running.load(Ordering::Relaxed) {
                    let slice = remaining.min(WAIT_SLICE);
                    tokio::time::sleep(slice).await;
                    remaining = remaining.saturating_sub(slice);
                }
            }

            tracing::debug!("monitor loop exited for {}", ip);
        }));
    }

    /// Transitions Running → Stopped: signals the loop to exit after its
    /// current iteration and joins it with a bounded wait. Stopping an
    /// already-stopped monitor is a no-op.
    pub async fn stop(&mut self) {
        if self.state != MonitorState::Running {
            return;
        }

        self.running.store(false, Ordering::Relaxed);
        self.state = MonitorState::Stopped;

        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(MONITOR_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("monitor task for {} ended abnormally: {}", self.ip, e);
                }
                Err(_) => {
                    tracing::warn!(
                        "monitor task for {} did not stop within {:?}; leaking it",
                        self.ip,
                        MONITOR_JOIN_TIMEOUT
                    );
                }
            }
        }
    }
}

async fn monitor_tick(
    ip: Ipv4Addr,
    probe: LivenessProbeFn,
    history: Arc<Mutex<HistoryBuffer>>,
    on_sample: Option<SampleCallback>,
    on_history: Option<HistoryCallback>,
) {
    let report = probe(ip).await;
    let timestamp = Utc::now();

    // Up requires both a successful probe and a numeric latency; anything
    // else is Down with the latency left undefined.
    let (latency_ms, status) = match report.latency_ms {
        Some(latency) if report.up && latency.is_finite() => {
            (Some(latency), SampleStatus::Up)
        }
        _ => (None, SampleStatus::Down),
    };

    let sample = Sample::new(timestamp, latency_ms, status);

    let snapshot = {
        let mut buffer = history.lock().await;
        buffer.push(sample.clone());
        buffer.snapshot()
    };

    if let Some(cb) = &on_sample {
        cb(ip, sample.latency_ms, sample.status, sample.timestamp);
    }
    if let Some(cb) = &on_history {
        cb(ip, snapshot);
    }
}

/// Supervised set of monitors, one per address, owned by the
/// orchestrating layer so shutdown is deterministic.
pub struct MonitorRegistry {
    settings: MonitorSettings,
    monitors: HashMap<Ipv4Addr, DeviceMonitor>,
}

impl MonitorRegistry {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            settings,
            monitors: HashMap::new(),
        }
    }

    /// Starts monitoring an address. Already-running addresses are left
    /// alone.
    pub fn start(
        &mut self,
        ip: Ipv4Addr,
        probe: LivenessProbeFn,
        on_sample: Option<SampleCallback>,
        on_history: Option<HistoryCallback>,
    ) {
        let monitor = self
            .monitors
            .entry(ip)
            .or_insert_with(|| DeviceMonitor::new(ip, self.settings.clone()));
        monitor.start(probe, on_sample, on_history);
    }

    /// Stops and discards one monitor; its history and alert state die
    /// with it.
    pub async fn stop(&mut self, ip: Ipv4Addr) {
        if let Some(mut monitor) = self.monitors.remove(&ip) {
            monitor.stop().await;
        }
    }

    /// Stops every monitor; independent failures to join are logged per
    /// monitor and do not affect the rest.
    pub async fn stop_all(&mut self) {
        for (_, mut monitor) in self.monitors.drain() {
            monitor.stop().await;
        }
    }

    pub fn is_running(&self, ip: Ipv4Addr) -> bool {
        self.monitors.get(&ip).is_some_and(DeviceMonitor::is_running)
    }

    pub fn monitored(&self) -> Vec<Ipv4Addr> {
        let mut ips: Vec<Ipv4Addr> = self.monitors.keys().copied().collect();
        ips.sort_by_key(|ip| u32::from(*ip));
        ips
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}
