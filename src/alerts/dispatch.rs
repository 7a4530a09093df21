//! Notification dispatch
//!
//! Forwards alert events to an injected sender capability, either
//! immediately (each event on the blocking pool, so monitoring loops
//! never wait on delivery) or batched (events accumulate behind one lock;
//! the first queued event arms a single timer whose firing drains the
//! whole queue atomically into one grouped notification).

use std::sync::{Arc, Mutex, PoisonError};

use crate::alerts::types::{AlertEvent, AlertKind, BatchReport};
use crate::config::AlertSettings;

/// The injected delivery capability. The core decides when and with what
/// content to notify; transport is the implementor's problem.
pub trait AlertSender: Send + Sync {
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> anyhow::Result<()>;
}

struct BatchQueue {
    events: Vec<AlertEvent>,
    timer_armed: bool,
}

pub struct NotificationDispatcher {
    settings: AlertSettings,
    sender: Arc<dyn AlertSender>,
    queue: Arc<Mutex<BatchQueue>>,
}

impl NotificationDispatcher {
    pub fn new(settings: AlertSettings, sender: Arc<dyn AlertSender>) -> Self {
        Self {
            settings,
            sender,
            queue: Arc::new(Mutex::new(BatchQueue {
                events: Vec::new(),
                timer_armed: false,
            })),
        }
    }

    /// Accepts one event for delivery. Each event is delivered at most
    /// once: immediately, or as part of exactly one batch flush.
    pub fn dispatch(&self, event: AlertEvent) {
        if self.settings.batch_alerts {
            self.enqueue(event);
        } else {
            self.send_immediate(event);
        }
    }

    /// Drops any queued events without sending, for shutdown.
    pub fn clear(&self) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if !queue.events.is_empty() {
            tracing::info!("discarding {} queued alert(s) on shutdown", queue.events.len());
        }
        queue.events.clear();
    }

    fn send_immediate(&self, event: AlertEvent) {
        let (subject, body) = compose_alert_message(&event, &self.settings);
        let sender = Arc::clone(&self.sender);
        let recipients = self.settings.recipients.clone();
        let ip = event.ip;

        tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || sender.send(&subject, &body, &recipients))
                    .await;
            match outcome {
                Ok(Ok(())) => {}
                // Delivery failure: logged, never resent within the same
                // cooldown window.
                Ok(Err(e)) => tracing::error!("alert delivery failed for {}: {}", ip, e),
                Err(e) => tracing::error!("alert delivery task failed for {}: {}", ip, e),
            }
        });
    }

    fn enqueue(&self, event: AlertEvent) {
        let arm_timer = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.events.push(event);
            if queue.timer_armed {
                false
            } else {
                queue.timer_armed = true;
                true
            }
        };

        if !arm_timer {
            return;
        }

        let queue = Arc::clone(&self.queue);
        let sender = Arc::clone(&self.sender);
        let settings = self.settings.clone();

        tokio::spawn(async move {
            tokio::time::sleep(settings.batch_interval).await;

            // Atomic drain: everything queued so far goes into this flush
            // and the timer disarms in the same critical section, so no
            // event is left behind or counted into two flushes.
            let drained = {
                let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
                queue.timer_armed = false;
                std::mem::take(&mut queue.events)
            };

            if drained.is_empty() {
                return;
            }

            let report = BatchReport::from_events(drained, settings.batch_interval);
            let (subject, body) = compose_batch_message(&report, &settings);
            let recipients = settings.recipients.clone();

            let outcome =
                tokio::task::spawn_blocking(move || sender.send(&subject, &body, &recipients))
                    .await;
            match outcome {
                Ok(Ok(())) => {
                    tracing::info!("batch alert delivered ({} events)", report.total);
                }
                Ok(Err(e)) => tracing::error!("batch alert delivery failed: {}", e),
                Err(e) => tracing::error!("batch alert delivery task failed: {}", e),
            }
        });
    }
}

fn format_latency(latency_ms: Option<f64>) -> String {
    match latency_ms {
        Some(v) => format!("{v:.2}ms"),
        None => "n/a".to_string(),
    }
}

/// Composes the subject and plain-text body for one event.
pub fn compose_alert_message(event: &AlertEvent, settings: &AlertSettings) -> (String, String) {
    let subject = format!("Network Monitor Alert - {}", event.kind.as_str());

    let hostname = event.device.hostname.as_deref().unwrap_or("unknown");
    let vendor = event.device.vendor.as_deref().unwrap_or("unknown");
    let mac = event.device.mac.as_deref().unwrap_or("unknown");

    let detail = match event.kind {
        AlertKind::DeviceDown => "- Device is not responding to probes\n".to_string(),
        AlertKind::HighLatency => format!(
            "- Latency ({}) exceeds threshold ({}ms)\n",
            format_latency(event.latency_ms),
            settings.latency_threshold_ms
        ),
    };

    let body = format!(
        "Network Monitor Alert - {kind}\n\
         \n\
         Device Information:\n\
         - IP Address: {ip}\n\
         - Hostname: {hostname}\n\
         - Vendor: {vendor}\n\
         - MAC: {mac}\n\
         - Latency: {latency}\n\
         - Alert Time: {time}\n\
         \n\
         Alert Details:\n\
         {detail}\n\
         Configuration:\n\
         - Latency Threshold: {threshold}ms\n\
         - Consecutive Failures Required: {failures}\n\
         - Cooldown Period: {cooldown} minutes\n",
        kind = event.kind.as_str(),
        ip = event.ip,
        hostname = hostname,
        vendor = vendor,
        mac = mac,
        latency = format_latency(event.latency_ms),
        time = event.timestamp.format("%Y-%m-%d %H:%M:%S"),
        detail = detail,
        threshold = settings.latency_threshold_ms,
        failures = settings.consecutive_failures,
        cooldown = settings.cooldown.as_secs() / 60,
    );

    (subject, body)
}

/// Composes the subject and plain-text body for a batch flush.
pub fn compose_batch_message(report: &BatchReport, settings: &AlertSettings) -> (String, String) {
    let subject = "Network Monitor Alert - Batch Report".to_string();
    let interval_minutes = report.interval.as_secs() / 60;

    let mut body = format!(
        "Network Monitor - Batch Alert Report\n\
         \n\
         This batch contains alerts collected over the last {interval_minutes} minute(s).\n\
         \n\
         Alert Summary:\n"
    );

    for (ip, events) in &report.events {
        // Events are appended in arrival order, so the last one is newest.
        let latest = match events.last() {
            Some(latest) => latest,
            None => continue,
        };
        let hostname = latest.device.hostname.as_deref().unwrap_or("unknown");
        body.push_str(&format!(
            "\n\
             Device: {ip} ({hostname})\n\
             - Alert Count: {count}\n\
             - Latest Condition: {kind}\n\
             - Latest Latency: {latency}\n\
             - Last Alert: {time}\n",
            ip = ip,
            hostname = hostname,
            count = events.len(),
            kind = latest.kind.as_str(),
            latency = format_latency(latest.latency_ms),
            time = latest.timestamp.format("%Y-%m-%d %H:%M:%S"),
        ));
    }

    body.push_str(&format!(
        "\n\
         Total Alerts: {total}\n\
         Batch Interval: {interval_minutes} minute(s)\n\
         \n\
         Configuration:\n\
         - Latency Threshold: {threshold}ms\n\
         - Consecutive Failures Required: {failures}\n\
         - Cooldown Period: {cooldown} minutes\n",
        total = report.total,
        interval_minutes = interval_minutes,
        threshold = settings.latency_threshold_ms,
        failures = settings.consecutive_failures,
        cooldown = settings.cooldown.as_secs() / 60,
    ));

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::types::DeviceContext;
    use chrono::Utc;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    type SentMessage = (String, String, Vec<String>);

    struct RecordingSender {
        calls: Mutex<Vec<SentMessage>>,
        fail: bool,
    }

    impl RecordingSender {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn calls(&self) -> Vec<SentMessage> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AlertSender for RecordingSender {
        fn send(&self, subject: &str, body: &str, recipients: &[String]) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push((
                subject.to_string(),
                body.to_string(),
                recipients.to_vec(),
            ));
            if self.fail {
                anyhow::bail!("sender exploded");
            }
            Ok(())
        }
    }

    fn event_for(ip: &str, kind: AlertKind) -> AlertEvent {
        AlertEvent::new(
            ip.parse::<Ipv4Addr>().unwrap(),
            kind,
            match kind {
                AlertKind::HighLatency => Some(1500.0),
                AlertKind::DeviceDown => None,
            },
            Utc::now(),
        )
        .with_device(DeviceContext::default())
    }

    fn batched_settings(interval: Duration) -> AlertSettings {
        AlertSettings {
            batch_alerts: true,
            batch_interval: interval,
            recipients: vec!["ops@example.com".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_batched_events_flush_as_one_grouped_call() {
        let sender = RecordingSender::new();
        let dispatcher = NotificationDispatcher::new(
            batched_settings(Duration::from_millis(50)),
            sender.clone(),
        );

        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        dispatcher.dispatch(event_for("10.0.0.2", AlertKind::HighLatency));
        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        dispatcher.dispatch(event_for("10.0.0.2", AlertKind::HighLatency));

        tokio::time::sleep(Duration::from_millis(200)).await;

        let calls = sender.calls();
        assert_eq!(calls.len(), 1, "one timer firing must produce one send");
        let (subject, body, recipients) = &calls[0];
        assert!(subject.contains("Batch"));
        assert!(body.contains("10.0.0.1"));
        assert!(body.contains("10.0.0.2"));
        assert!(body.contains("Total Alerts: 5"));
        assert_eq!(recipients, &vec!["ops@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_events_after_flush_start_a_new_batch() {
        let sender = RecordingSender::new();
        let dispatcher = NotificationDispatcher::new(
            batched_settings(Duration::from_millis(40)),
            sender.clone(),
        );

        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        tokio::time::sleep(Duration::from_millis(120)).await;

        dispatcher.dispatch(event_for("10.0.0.2", AlertKind::DeviceDown));
        tokio::time::sleep(Duration::from_millis(120)).await;

        let calls = sender.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.contains("Total Alerts: 1"));
        assert!(calls[1].1.contains("Total Alerts: 1"));
        assert!(calls[1].1.contains("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_immediate_mode_sends_each_event() {
        let sender = RecordingSender::new();
        let settings = AlertSettings {
            recipients: vec!["ops@example.com".to_string()],
            ..Default::default()
        };
        let dispatcher = NotificationDispatcher::new(settings, sender.clone());

        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        dispatcher.dispatch(event_for("10.0.0.2", AlertKind::HighLatency));
        dispatcher.dispatch(event_for("10.0.0.3", AlertKind::DeviceDown));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let calls = sender.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().any(|(s, _, _)| s.contains("Device Down")));
        assert!(calls.iter().any(|(s, _, _)| s.contains("High Latency")));
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_later_dispatches() {
        let sender = RecordingSender::failing();
        let dispatcher =
            NotificationDispatcher::new(AlertSettings::default(), sender.clone());

        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.dispatch(event_for("10.0.0.2", AlertKind::DeviceDown));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Both attempts reached the sender even though each one failed.
        assert_eq!(sender.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_discards_queued_events() {
        let sender = RecordingSender::new();
        let dispatcher = NotificationDispatcher::new(
            batched_settings(Duration::from_millis(40)),
            sender.clone(),
        );

        dispatcher.dispatch(event_for("10.0.0.1", AlertKind::DeviceDown));
        dispatcher.clear();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(sender.calls().is_empty());
    }

    #[test]
    fn test_alert_body_mentions_threshold_for_high_latency() {
        let settings = AlertSettings::default();
        let event = event_for("192.168.1.44", AlertKind::HighLatency);
        let (subject, body) = compose_alert_message(&event, &settings);
        assert!(subject.contains("High Latency"));
        assert!(body.contains("192.168.1.44"));
        assert!(body.contains("1500.00ms"));
        assert!(body.contains("1000ms"));
    }
}
