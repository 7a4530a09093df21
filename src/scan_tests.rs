//! Orchestrator tests with an injected fake prober

use super::*;
use crate::models::{DeviceRecord, DeviceStatus};
use crate::range::enumerate_hosts;
use std::time::Duration;

fn record_for(ip: Ipv4Addr, latency_ms: f64) -> DeviceRecord {
    let mut record = DeviceRecord::new(ip, DeviceStatus::Online);
    record.response_time_ms = Some(latency_ms);
    record
}

fn progress_recorder() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cb: ProgressCallback = Arc::new(move |percent| {
        sink.lock().unwrap().push(percent);
    });
    (cb, seen)
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100_once() {
    let targets = enumerate_hosts("10.0.0.0/28").unwrap();
    let (progress_cb, seen) = progress_recorder();

    let devices = run_scan(
        targets,
        &ScanOptions { concurrency: 4 },
        |ip| async move { Some(record_for(ip, 1.0)) },
        None,
        Some(progress_cb),
        CancelToken::new(),
    )
    .await;

    assert_eq!(devices.len(), 14);

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress regressed: {seen:?}");
    assert_eq!(*seen.last().unwrap(), 100);
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);
}

#[tokio::test]
async fn test_results_are_sorted_by_address() {
    let targets = enumerate_hosts("192.168.5.0/29").unwrap();

    // Later addresses answer sooner, so completion order is inverted.
    let devices = run_scan(
        targets,
        &ScanOptions { concurrency: 8 },
        |ip| async move {
            let delay = 40u64.saturating_sub(u64::from(ip.octets()[3]) * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Some(record_for(ip, 2.0))
        },
        None,
        None,
        CancelToken::new(),
    )
    .await;

    let ips: Vec<u32> = devices.iter().map(|d| u32::from(d.ip)).collect();
    let mut sorted = ips.clone();
    sorted.sort_unstable();
    assert_eq!(ips, sorted);
}

#[tokio::test]
async fn test_record_callback_fires_per_device() {
    let targets = enumerate_hosts("10.1.0.0/29").unwrap();
    let seen: Arc<Mutex<Vec<Ipv4Addr>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let record_cb: RecordCallback = Arc::new(move |record| {
        sink.lock().unwrap().push(record.ip);
    });

    // Only even final octets respond.
    let devices = run_scan(
        targets,
        &ScanOptions::default(),
        |ip| async move {
            if ip.octets()[3] % 2 == 0 {
                Some(record_for(ip, 3.0))
            } else {
                None
            }
        },
        Some(record_cb),
        None,
        CancelToken::new(),
    )
    .await;

    assert_eq!(seen.lock().unwrap().len(), devices.len());
    assert!(devices.iter().all(|d| d.ip.octets()[3] % 2 == 0));
}

#[tokio::test]
async fn test_cancelled_before_start_returns_empty_and_closes_progress() {
    let targets = enumerate_hosts("10.2.0.0/28").unwrap();
    let (progress_cb, seen) = progress_recorder();

    let cancel = CancelToken::new();
    cancel.cancel();

    let devices = run_scan(
        targets,
        &ScanOptions::default(),
        |ip| async move { Some(record_for(ip, 1.0)) },
        None,
        Some(progress_cb),
        cancel,
    )
    .await;

    assert!(devices.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![100]);
}

#[tokio::test]
async fn test_mid_scan_cancel_returns_partial_results() {
    let targets = enumerate_hosts("10.3.0.0/29").unwrap();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let (progress_cb, seen) = progress_recorder();

    // Serial dispatch; the second probe flips the flag, so its own result
    // is discarded and nothing further is dispatched.
    let devices = run_scan(
        targets.clone(),
        &ScanOptions { concurrency: 1 },
        move |ip| {
            let trigger = trigger.clone();
            async move {
                if ip == "10.3.0.2".parse::<Ipv4Addr>().unwrap() {
                    trigger.cancel();
                }
                Some(record_for(ip, 1.0))
            }
        },
        None,
        Some(progress_cb),
        cancel,
    )
    .await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ip, targets[0]);

    let seen = seen.lock().unwrap();
    assert_eq!(*seen.last().unwrap(), 100);
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);
}

#[tokio::test]
async fn test_panicking_probe_is_a_soft_failure() {
    let targets = enumerate_hosts("10.4.0.0/29").unwrap();
    let victim: Ipv4Addr = "10.4.0.3".parse().unwrap();

    let devices = run_scan(
        targets,
        &ScanOptions { concurrency: 2 },
        move |ip| async move {
            if ip == victim {
                panic!("probe blew up");
            }
            Some(record_for(ip, 1.0))
        },
        None,
        None,
        CancelToken::new(),
    )
    .await;

    assert_eq!(devices.len(), 5);
    assert!(devices.iter().all(|d| d.ip != victim));
}

#[tokio::test]
async fn test_two_host_range_end_to_end() {
    // "10.0.0.0/30": .1 answers discovery in ~12ms, .2 never answers.
    let targets = enumerate_hosts("10.0.0.0/30").unwrap();
    assert_eq!(targets.len(), 2);
    let (progress_cb, seen) = progress_recorder();

    let devices = run_scan(
        targets,
        &ScanOptions::default(),
        |ip| async move {
            if ip == "10.0.0.1".parse::<Ipv4Addr>().unwrap() {
                Some(record_for(ip, 12.0))
            } else {
                None
            }
        },
        None,
        Some(progress_cb),
        CancelToken::new(),
    )
    .await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ip, "10.0.0.1".parse::<Ipv4Addr>().unwrap());
    assert_eq!(devices[0].response_time_ms, Some(12.0));
    assert_eq!(devices[0].status, DeviceStatus::Online);
    assert_eq!(*seen.lock().unwrap().last().unwrap(), 100);
}
