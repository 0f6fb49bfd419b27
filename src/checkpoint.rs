use crate::retry::{Backoff, RetryError, RetryExecutor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Default cadence for periodic checkpoints (once a minute).
pub const DEFAULT_CHECKPOINT_INTERVAL_MS: u64 = 60_000;

/// Failure classes surfaced by checkpoint stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    /// Transient store pushback; safe to retry.
    #[error("checkpoint throttled: {0}")]
    Throttled(String),
    /// Another worker took over the shard lease. Retrying could violate
    /// ownership exclusivity.
    #[error("shard ownership lost")]
    OwnershipLost,
    /// The store rejected the record outright; retrying is futile.
    #[error("invalid checkpoint state: {0}")]
    InvalidState(String),
}

impl CheckpointError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CheckpointError::Throttled(_))
    }
}

/// Durable cursor record for one shard, checksummed so a store can detect
/// corruption on read-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRecord {
    pub shard_id: String,
    pub sequence: u64,
    pub committed_at_ms: u64,
    pub checksum: String,
}

impl CursorRecord {
    /// Builds a record with its checksum over the logical fields.
    pub fn new(shard_id: impl Into<String>, sequence: u64, committed_at_ms: u64) -> Self {
        let shard_id = shard_id.into();
        let checksum = compute_checksum(&shard_id, sequence, committed_at_ms);
        Self {
            shard_id,
            sequence,
            committed_at_ms,
            checksum,
        }
    }

    /// True when the stored checksum matches the logical fields.
    pub fn verify(&self) -> bool {
        self.checksum == compute_checksum(&self.shard_id, self.sequence, self.committed_at_ms)
    }
}

fn compute_checksum(shard_id: &str, sequence: u64, committed_at_ms: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(shard_id.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(committed_at_ms.to_be_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        encoded.push_str(&format!("{:02x}", byte));
    }
    encoded
}

/// Contract implemented by durable cursor stores.
pub trait CheckpointStore {
    fn commit(&mut self, record: CursorRecord) -> Result<(), CheckpointError>;
}

/// In-process store keyed by shard id. Clones share the same table, so the
/// application harness can read cursors back after a worker thread retires.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    committed: Arc<Mutex<HashMap<String, CursorRecord>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed record for a shard, if any.
    pub fn committed(&self, shard_id: &str) -> Option<CursorRecord> {
        self.committed.lock().unwrap().get(shard_id).cloned()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn commit(&mut self, record: CursorRecord) -> Result<(), CheckpointError> {
        if !record.verify() {
            return Err(CheckpointError::InvalidState(format!(
                "checksum mismatch for shard {}",
                record.shard_id
            )));
        }
        self.committed
            .lock()
            .unwrap()
            .insert(record.shard_id.clone(), record);
        Ok(())
    }
}

/// Outcome of one checkpoint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Committed(CursorRecord),
    Skipped(CheckpointSkipReason),
}

/// Reason why a checkpoint attempt was skipped instead of committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointSkipReason {
    /// No record has been processed yet; there is no cursor to persist.
    NoProgress,
    /// The requested cursor is behind the committed one.
    StaleCursor,
    /// The store reported the shard lease is gone; not retried.
    OwnershipLost,
    /// The store rejected the record as invalid; not retried.
    InvalidState,
    /// Transient failures persisted through every retry attempt.
    RetriesExhausted,
}

/// Tracks the durable cursor for one shard and advances it with bounded
/// retries for transient failures.
#[derive(Debug)]
pub struct CheckpointManager<S: CheckpointStore> {
    store: S,
    shard_id: String,
    interval_ms: u64,
    next_deadline_ms: u64,
    committed_sequence: Option<u64>,
}

impl<S: CheckpointStore> CheckpointManager<S> {
    /// Creates a manager for one shard. The first deadline is in the past, so
    /// the first batch triggers an immediate checkpoint.
    pub fn new(shard_id: impl Into<String>, store: S, interval_ms: u64) -> Self {
        Self {
            store,
            shard_id: shard_id.into(),
            interval_ms,
            next_deadline_ms: 0,
            committed_sequence: None,
        }
    }

    /// True once wall-clock time has passed the scheduled deadline.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms > self.next_deadline_ms
    }

    /// Sequence of the last durable commit, if any.
    pub fn committed_sequence(&self) -> Option<u64> {
        self.committed_sequence
    }

    /// Persists the cursor. `Throttled` failures are retried through the
    /// executor; `OwnershipLost` and `InvalidState` short-circuit into a skip.
    /// Every attempt reschedules the deadline to `now + interval`, committed
    /// or skipped, so a failing store is probed once per interval instead of
    /// once per batch.
    pub fn checkpoint<B: Backoff>(
        &mut self,
        retry: &mut RetryExecutor<B>,
        cursor: u64,
        now_ms: u64,
    ) -> CheckpointOutcome {
        if let Some(committed) = self.committed_sequence {
            if cursor < committed {
                return CheckpointOutcome::Skipped(CheckpointSkipReason::StaleCursor);
            }
        }
        let record = CursorRecord::new(self.shard_id.clone(), cursor, now_ms);
        let store = &mut self.store;
        let result = retry.execute(
            || store.commit(record.clone()),
            CheckpointError::is_transient,
        );
        // Rescheduled on every attempt, not only on a commit.
        self.next_deadline_ms = now_ms + self.interval_ms;
        match result {
            Ok(()) => {
                self.committed_sequence = Some(cursor);
                CheckpointOutcome::Committed(record)
            }
            Err(RetryError::Aborted(CheckpointError::OwnershipLost)) => {
                CheckpointOutcome::Skipped(CheckpointSkipReason::OwnershipLost)
            }
            Err(RetryError::Aborted(_)) => {
                CheckpointOutcome::Skipped(CheckpointSkipReason::InvalidState)
            }
            Err(RetryError::Exhausted { .. }) => {
                CheckpointOutcome::Skipped(CheckpointSkipReason::RetriesExhausted)
            }
        }
    }
}
