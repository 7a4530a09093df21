//! Scan orchestration
//!
//! Runs the probe chain over an address list with a bounded worker pool,
//! forwarding records and integer progress as results land. Cancellation
//! is cooperative: the shared flag is checked before each dispatch, and
//! results of probes already in flight are discarded once cancellation
//! has been observed.

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::config::DEFAULT_SCAN_CONCURRENCY;
use crate::models::DeviceRecord;

/// Invoked once per discovered device, as each probe completes
pub type RecordCallback = Arc<dyn Fn(&DeviceRecord) + Send + Sync>;

/// Invoked with completed/total percent (0–100, non-decreasing)
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Shared cooperative-cancellation flag for one scan pass
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Upper bound on concurrently probed addresses
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }
}

/// Aggregation state shared by the workers; progress is emitted under
/// this lock so observers always see ordered values.
struct Aggregate {
    devices: Vec<DeviceRecord>,
    completed: usize,
    last_percent: u8,
}

struct ScanShared {
    aggregate: Mutex<Aggregate>,
    total: usize,
    on_record: Option<RecordCallback>,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl ScanShared {
    fn settle(&self, result: Option<DeviceRecord>) {
        let mut agg = match self.aggregate.lock() {
            Ok(agg) => agg,
            Err(_) => {
                tracing::warn!("scan aggregate lock poisoned; dropping result");
                return;
            }
        };
        agg.completed += 1;

        // Results landing after cancellation are discarded and no further
        // progress is reported; the epilogue closes progress at 100.
        if self.cancel.is_cancelled() {
            return;
        }

        if let Some(record) = result {
            if let Some(cb) = &self.on_record {
                cb(&record);
            }
            agg.devices.push(record);
        }

        let percent = (agg.completed * 100 / self.total) as u8;
        agg.last_percent = percent;
        if let Some(cb) = &self.on_progress {
            cb(percent);
        }
    }
}

/// Probes every target with bounded concurrency and returns the records
/// of responding hosts, sorted by ascending address.
///
/// The prober is injected so callers can wire in the full chain, the
/// liveness-only portion, or a test double. A panicking probe is logged
/// as a soft failure and does not abort the batch. On cancellation the
/// partial list gathered so far is returned without error.
pub async fn run_scan<P, Fut>(
    targets: Vec<Ipv4Addr>,
    options: &ScanOptions,
    prober: P,
    on_record: Option<RecordCallback>,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> Vec<DeviceRecord>
where
    P: Fn(Ipv4Addr) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Option<DeviceRecord>> + Send + 'static,
{
    let total = targets.len();
    let shared = Arc::new(ScanShared {
        aggregate: Mutex::new(Aggregate {
            devices: Vec::new(),
            completed: 0,
            last_percent: 0,
        }),
        total: total.max(1),
        on_record,
        on_progress,
        cancel: cancel.clone(),
    });

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut handles = Vec::with_capacity(total);

    for ip in targets {
        // Cooperative cancellation point: no further work is dispatched.
        if cancel.is_cancelled() {
            break;
        }

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        if cancel.is_cancelled() {
            break;
        }

        let prober = prober.clone();
        let shared = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let result = prober(ip).await;
            shared.settle(result);
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!("probe worker failed: {}", e);
        }
    }

    let mut agg = match shared.aggregate.lock() {
        Ok(agg) => agg,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut devices = std::mem::take(&mut agg.devices);

    // Progress closes at exactly 100 whether the scan ran to completion
    // or was cancelled partway.
    if agg.last_percent < 100 {
        agg.last_percent = 100;
        if let Some(cb) = &shared.on_progress {
            cb(100);
        }
    }
    drop(agg);

    devices.sort_by_key(|record| u32::from(record.ip));
    devices
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod scan_tests;
