//! Fixed-capacity sample history

use std::collections::VecDeque;

use crate::models::Sample;

/// Ring of the most recent samples for one monitored device.
///
/// Length never exceeds capacity; pushing to a full buffer drops the
/// oldest sample. Ordering is strictly chronological because samples are
/// only appended from the owning monitor's loop.
#[derive(Debug)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleStatus;
    use chrono::{Duration, Utc};

    fn sample_at(offset_secs: i64) -> Sample {
        Sample::new(
            Utc::now() + Duration::seconds(offset_secs),
            Some(offset_secs as f64),
            SampleStatus::Up,
        )
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = HistoryBuffer::new(5);
        for i in 0..12 {
            buffer.push(sample_at(i));
            assert!(buffer.len() <= 5);
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_keeps_most_recent_in_order() {
        let capacity = 4;
        let extra = 3;
        let mut buffer = HistoryBuffer::new(capacity);
        for i in 0..(capacity + extra) {
            buffer.push(sample_at(i as i64));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), capacity);
        let latencies: Vec<f64> = snapshot.iter().filter_map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![3.0, 4.0, 5.0, 6.0]);
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = HistoryBuffer::new(0);
        buffer.push(sample_at(0));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.capacity(), 1);
    }
}
