use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use price_alert_core::Delivery;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_CAPACITY: usize = 100;

/// A locally recorded alert message.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub message: String,
    pub recorded_at: DateTime<Utc>,
    pub delivery: Delivery,
}

/// Most recent alerts, newest last. Older entries are dropped once the
/// capacity is reached; the service log keeps the full record.
#[derive(Debug, Clone)]
pub struct AlertLog {
    records: Arc<Mutex<VecDeque<AlertRecord>>>,
    capacity: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AlertLog {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, message: &str, delivery: Delivery) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(AlertRecord {
            message: message.to_string(),
            recorded_at: Utc::now(),
            delivery,
        });
    }

    #[must_use]
    pub fn recent(&self) -> Vec<AlertRecord> {
        self.records.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
