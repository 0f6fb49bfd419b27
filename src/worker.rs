use crate::alert::AlertSink;
use crate::checkpoint::{CheckpointOutcome, CheckpointStore};
use crate::config::ProcessorConfig;
use crate::processor::{
    ProcessorTelemetry, ShardLifecycle, ShardProcessor, ShutdownReason, StreamRecord,
};
use crate::retry::ThreadBackoff;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;

/// Wall-clock source driving checkpoint deadlines inside a worker.
pub trait MonotonicClock {
    /// Milliseconds elapsed on a monotonically non-decreasing timeline.
    fn now_ms(&mut self) -> u64;
}

/// System clock implementation backed by `Instant`.
#[derive(Debug, Clone)]
pub struct SystemMonotonicClock {
    start: Instant,
}

impl Default for SystemMonotonicClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl SystemMonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MonotonicClock for SystemMonotonicClock {
    fn now_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }
}

/// Commands consumed by a shard worker thread, in submission order.
enum WorkerCommand {
    Batch(Vec<StreamRecord>),
    Shutdown(ShutdownReason),
}

/// Failure submitting work to a shard worker.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The bounded queue is full; the batch is handed back to the caller.
    #[error("worker queue for shard is full")]
    Full(Vec<StreamRecord>),
    /// The worker is shutting down or gone.
    #[error("worker queue for shard is closed")]
    Closed(Vec<StreamRecord>),
}

/// Failure retrieving a worker's final report.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("shard worker thread panicked")]
    Panicked,
}

/// Final state reported by a worker after its processor terminates.
#[derive(Debug, Clone)]
pub struct ShardRunReport {
    pub shard_id: String,
    pub lifecycle: ShardLifecycle,
    pub telemetry: ProcessorTelemetry,
    pub final_checkpoint: Option<CheckpointOutcome>,
}

struct QueueState {
    buffer: VecDeque<WorkerCommand>,
    closed: bool,
}

/// Bounded Mutex+Condvar command queue shared between the handle and the
/// worker thread. Closing rejects further submissions but lets the worker
/// drain what was already accepted (cooperative shutdown: in-flight batches
/// complete before shutdown logic runs).
struct SharedQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl SharedQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState {
                buffer: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    fn push_batch(&self, records: Vec<StreamRecord>) -> Result<(), SubmitError> {
        let mut guard = self.state.lock().unwrap();
        if guard.closed {
            return Err(SubmitError::Closed(records));
        }
        if guard.buffer.len() >= self.capacity {
            return Err(SubmitError::Full(records));
        }
        guard.buffer.push_back(WorkerCommand::Batch(records));
        self.cv.notify_one();
        Ok(())
    }

    fn push_shutdown(&self, reason: ShutdownReason) {
        let mut guard = self.state.lock().unwrap();
        if guard.closed {
            return;
        }
        guard.closed = true;
        guard.buffer.push_back(WorkerCommand::Shutdown(reason));
        self.cv.notify_one();
    }

    fn pop(&self) -> Option<WorkerCommand> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(command) = guard.buffer.pop_front() {
                return Some(command);
            }
            if guard.closed {
                return None;
            }
            guard = self.cv.wait(guard).unwrap();
        }
    }
}

/// Default queue capacity per shard worker.
pub const WORKER_QUEUE_CAPACITY: usize = 64;

/// One shard, one worker thread. The worker owns the shard's processor
/// outright, so aggregate state and the cursor are never shared across
/// shards; the backoff sleeps of its retry executor block only this thread.
pub struct ShardWorker {
    shared: Arc<SharedQueue>,
    join: JoinHandle<ShardRunReport>,
}

impl ShardWorker {
    /// Spawns a worker for `shard_id`. The store and alert sink move into the
    /// worker thread; alert sinks shared across shards (e.g. an `AlertBus`
    /// clone) attribute every signal to its originating shard.
    pub fn spawn<S, A>(
        shard_id: impl Into<String>,
        config: &ProcessorConfig,
        store: S,
        alerts: A,
    ) -> Self
    where
        S: CheckpointStore + Send + 'static,
        A: AlertSink + Send + 'static,
    {
        let shard_id = shard_id.into();
        let shared = Arc::new(SharedQueue::new(WORKER_QUEUE_CAPACITY));
        let queue = Arc::clone(&shared);
        let mut processor =
            ShardProcessor::new(shard_id.clone(), config, store, alerts, ThreadBackoff);
        let join = thread::spawn(move || {
            let mut clock = SystemMonotonicClock::new();
            let mut final_checkpoint = None;
            while let Some(command) = queue.pop() {
                match command {
                    WorkerCommand::Batch(records) => {
                        if processor.process_batch(&records, clock.now_ms()).is_err() {
                            break;
                        }
                    }
                    WorkerCommand::Shutdown(reason) => {
                        final_checkpoint = processor
                            .shutdown(reason, clock.now_ms())
                            .unwrap_or(None);
                        break;
                    }
                }
            }
            ShardRunReport {
                shard_id,
                lifecycle: processor.lifecycle(),
                telemetry: processor.telemetry().clone(),
                final_checkpoint,
            }
        });
        Self { shared, join }
    }

    /// Enqueues one ordered batch. Returns the batch on pushback so the
    /// caller can re-deliver.
    pub fn submit_batch(&self, records: Vec<StreamRecord>) -> Result<(), SubmitError> {
        self.shared.push_batch(records)
    }

    /// Requests cooperative shutdown: batches accepted before this call are
    /// still processed, then the processor terminates with `reason`.
    pub fn shutdown(&self, reason: ShutdownReason) {
        self.shared.push_shutdown(reason);
    }

    /// Waits for the worker thread and returns its final report.
    pub fn join(self) -> Result<ShardRunReport, WorkerError> {
        self.join.join().map_err(|_| WorkerError::Panicked)
    }
}
