use crate::codec::SensorReading;
use std::collections::HashMap;

/// Default breach threshold: temperatures strictly above this count as highs.
pub const DEFAULT_TEMPERATURE_THRESHOLD: i64 = 50;
/// Default number of highs a sensor must exceed before an alert fires.
pub const DEFAULT_ALERT_AFTER: u64 = 5;

/// Decision returned for each observed reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    NoAlert,
    Alert,
}

/// Per-sensor breach counter with an alert trigger.
///
/// Counters only ever climb: a reading at or below the threshold leaves the
/// counter untouched, and crossing `alert_after` re-fires the alert on every
/// subsequent breach rather than only once. State is in-memory only and lost
/// on restart.
#[derive(Debug, Clone)]
pub struct ThresholdAggregator {
    threshold: i64,
    alert_after: u64,
    highs: HashMap<String, u64>,
}

impl Default for ThresholdAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPERATURE_THRESHOLD, DEFAULT_ALERT_AFTER)
    }
}

impl ThresholdAggregator {
    /// Creates an aggregator with the provided breach and alert thresholds.
    pub fn new(threshold: i64, alert_after: u64) -> Self {
        Self {
            threshold,
            alert_after,
            highs: HashMap::new(),
        }
    }

    /// Folds a reading into the per-sensor state and reports whether the
    /// sensor has breached often enough to alert.
    pub fn observe(&mut self, reading: &SensorReading) -> AlertDecision {
        if reading.temperature <= self.threshold {
            return AlertDecision::NoAlert;
        }
        let counter = self.highs.entry(reading.sensor_id.clone()).or_insert(0);
        *counter += 1;
        if *counter > self.alert_after {
            AlertDecision::Alert
        } else {
            AlertDecision::NoAlert
        }
    }

    /// Returns the breach counter for a sensor (0 when never breached).
    pub fn breach_count(&self, sensor_id: &str) -> u64 {
        self.highs.get(sensor_id).copied().unwrap_or(0)
    }

    /// Number of sensors with at least one recorded breach.
    pub fn tracked_sensors(&self) -> usize {
        self.highs.len()
    }

    /// Breach threshold applied to incoming readings.
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Count of highs after which alerts start firing.
    pub fn alert_after(&self) -> u64 {
        self.alert_after
    }
}
