use crate::aggregate::Phase;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A measurement taken at an iteration boundary, flowing through the buses
/// to telemetry and persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub batch: u32,
    pub epoch: u32,
    pub phase: Phase,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, batch: u32, epoch: u32, phase: Phase) -> Self {
        Self {
            name: name.into(),
            value,
            batch,
            epoch,
            phase,
        }
    }
}

/// Delivery envelope wrapping a payload with its topic, sender and a
/// unix-epoch millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<P> {
    pub topic: String,
    pub sender: String,
    pub timestamp_ms: u64,
    pub payload: P,
}

impl<P> Message<P> {
    pub fn new(topic: &str, sender: &str, payload: P) -> Self {
        Self {
            topic: topic.to_string(),
            sender: sender.to_string(),
            timestamp_ms: now_ms(),
            payload,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
