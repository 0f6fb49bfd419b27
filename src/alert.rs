use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

/// Alert emitted when a sensor keeps breaching the temperature threshold.
/// Tagged with the originating shard so concurrent shards never overwrite
/// each other's signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSignal {
    pub shard_id: String,
    pub sensor_id: String,
    pub observed_at_ms: u64,
}

/// Failure publishing an alert.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlertSinkError {
    #[error("alert sink congested: {0}")]
    Congested(String),
    #[error("alert sink closed")]
    Closed,
}

impl AlertSinkError {
    /// Congestion is worth retrying; a closed sink is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, AlertSinkError::Congested(_))
    }
}

/// Contract implemented by alert consumers (event buses, test recorders).
pub trait AlertSink {
    fn publish(&mut self, alert: AlertSignal) -> Result<(), AlertSinkError>;
}

/// Append-only, thread-safe alert channel. Clones share one underlying
/// stream, so any number of shard workers can publish into a single receiver.
#[derive(Debug, Clone)]
pub struct AlertBus {
    sender: Sender<AlertSignal>,
}

impl AlertBus {
    /// Creates a bus and the receiver that drains it.
    pub fn unbounded() -> (Self, AlertReceiver) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, AlertReceiver { receiver })
    }
}

impl AlertSink for AlertBus {
    fn publish(&mut self, alert: AlertSignal) -> Result<(), AlertSinkError> {
        self.sender.send(alert).map_err(|_| AlertSinkError::Closed)
    }
}

/// Consumer end of an [`AlertBus`].
#[derive(Debug)]
pub struct AlertReceiver {
    receiver: Receiver<AlertSignal>,
}

impl AlertReceiver {
    /// Drains every alert published so far, in delivery order.
    pub fn drain(&self) -> Vec<AlertSignal> {
        self.receiver.try_iter().collect()
    }
}
