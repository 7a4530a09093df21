//! Threshold evaluation state machine
//!
//! One state per monitored address: a consecutive-failure counter and the
//! time of the last alert. The counter increments on every qualifying
//! sample and resets only on a fully in-threshold recovery; it is never
//! reset just because an alert went out. The cooldown clock is shared per
//! address across both alert kinds.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Mutex, PoisonError};

use crate::alerts::types::{AlertEvent, AlertKind, DeviceContext};
use crate::config::AlertSettings;
use crate::error::LanwatchError;
use crate::models::{Sample, SampleStatus};

#[derive(Debug, Default, Clone)]
struct AlertState {
    failures: u32,
    last_alert: Option<DateTime<Utc>>,
}

pub struct AlertEvaluator {
    settings: AlertSettings,
    cooldown: chrono::Duration,
    states: Mutex<HashMap<Ipv4Addr, AlertState>>,
}

impl AlertEvaluator {
    /// Validates the settings up front; thresholds are trusted afterward.
    pub fn new(settings: AlertSettings) -> Result<Self, LanwatchError> {
        settings.validate()?;
        let cooldown = chrono::Duration::from_std(settings.cooldown).map_err(|_| {
            LanwatchError::InvalidThreshold("cooldown window out of range".to_string())
        })?;
        Ok(Self {
            settings,
            cooldown,
            states: Mutex::new(HashMap::new()),
        })
    }

    /// Inspects one sample and returns an alert event when it tips the
    /// state machine over the configured thresholds.
    ///
    /// Decisions are made against the sample's own timestamp, so replayed
    /// or backdated samples behave deterministically. Never panics on
    /// malformed latencies: non-finite values fold into the down path.
    pub fn evaluate(
        &self,
        ip: Ipv4Addr,
        sample: &Sample,
        device: &DeviceContext,
    ) -> Option<AlertEvent> {
        let now = sample.timestamp;
        let latency = sample.latency_ms.filter(|v| v.is_finite());

        let condition = if sample.status == SampleStatus::Down || latency.is_none() {
            Some(AlertKind::DeviceDown)
        } else if latency.is_some_and(|v| v > self.settings.latency_threshold_ms) {
            Some(AlertKind::HighLatency)
        } else {
            None
        };

        let mut states = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(ip).or_default();

        let Some(kind) = condition else {
            state.failures = 0;
            return None;
        };

        state.failures = state.failures.saturating_add(1);
        tracing::debug!(
            "{} {} count: {}/{}",
            ip,
            kind.as_str(),
            state.failures,
            self.settings.consecutive_failures
        );

        let enabled = match kind {
            AlertKind::DeviceDown => self.settings.alert_on_down,
            AlertKind::HighLatency => self.settings.alert_on_high_latency,
        };
        if !enabled {
            return None;
        }

        if state.failures < self.settings.consecutive_failures {
            return None;
        }

        if let Some(last) = state.last_alert {
            if now.signed_duration_since(last) < self.cooldown {
                tracing::debug!("cooldown active for {}, suppressing {}", ip, kind.as_str());
                return None;
            }
        }

        state.last_alert = Some(now);

        let observed = match kind {
            AlertKind::HighLatency => latency,
            AlertKind::DeviceDown => None,
        };
        Some(AlertEvent::new(ip, kind, observed, now).with_device(device.clone()))
    }

    /// Current consecutive-failure count for an address.
    pub fn failure_count(&self, ip: Ipv4Addr) -> u32 {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ip)
            .map(|s| s.failures)
            .unwrap_or(0)
    }

    /// Discards the state for an address whose monitoring has stopped.
    pub fn forget(&self, ip: Ipv4Addr) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ip);
    }
}
