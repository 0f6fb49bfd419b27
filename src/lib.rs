//! Shard-level stream record processor.
//!
//! One [`ShardProcessor`] owns one shard of an event stream: it decodes
//! ordered batches of opaque records into sensor readings, tracks per-sensor
//! threshold breaches, pushes alerts onto a shard-attributed bus, and
//! advances a durable checkpoint cursor with bounded retry/backoff.
//! Batch retrieval, stream provisioning, and lease assignment are external
//! collaborators; batches arrive already fetched.

pub mod alert;
pub mod app;
pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod generator;
pub mod logging;
pub mod processor;
pub mod retry;
pub mod threshold;
pub mod worker;

pub use alert::{AlertBus, AlertReceiver, AlertSignal, AlertSink, AlertSinkError};
pub use checkpoint::{
    CheckpointError, CheckpointManager, CheckpointOutcome, CheckpointSkipReason, CheckpointStore,
    CursorRecord, MemoryCheckpointStore, DEFAULT_CHECKPOINT_INTERVAL_MS,
};
pub use codec::{decode, encode, DecodeError, SensorReading};
pub use config::{ConfigError, ProcessorConfig};
pub use generator::{ReadingGenerator, HOT_WINDOW_END, HOT_WINDOW_START, SENSOR_IDS};
pub use logging::{LogLevel, LogRotationPolicy, LogSegment, LoggingError, ShardLogger};
pub use processor::{
    BatchSummary, ProcessorError, ProcessorTelemetry, ShardLifecycle, ShardProcessor,
    ShutdownReason, StreamRecord,
};
pub use retry::{
    Backoff, RetryError, RetryExecutor, RetryPolicy, ThreadBackoff, DEFAULT_BACKOFF_DELAY_MS,
    DEFAULT_MAX_ATTEMPTS,
};
pub use threshold::{
    AlertDecision, ThresholdAggregator, DEFAULT_ALERT_AFTER, DEFAULT_TEMPERATURE_THRESHOLD,
};
pub use worker::{
    MonotonicClock, ShardRunReport, ShardWorker, SubmitError, SystemMonotonicClock, WorkerError,
    WORKER_QUEUE_CAPACITY,
};
