//! Threshold alerting: evaluation and dispatch

mod dispatch;
mod evaluator;
mod types;

pub use dispatch::{compose_alert_message, compose_batch_message, AlertSender, NotificationDispatcher};
pub use evaluator::AlertEvaluator;
pub use types::{AlertEvent, AlertKind, BatchReport, DeviceContext};
