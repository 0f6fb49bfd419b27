use crate::alert::{AlertSignal, AlertSink, AlertSinkError};
use crate::checkpoint::{
    CheckpointManager, CheckpointOutcome, CheckpointSkipReason, CheckpointStore,
};
use crate::codec::{self, SensorReading};
use crate::config::ProcessorConfig;
use crate::logging::{LogLevel, LogRotationPolicy, ShardLogger};
use crate::retry::{Backoff, RetryError, RetryExecutor};
use crate::threshold::{AlertDecision, ThresholdAggregator};
use thiserror::Error;

/// Opaque record handed to the processor by the batch source, stamped with
/// its per-shard sequence position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

impl StreamRecord {
    pub fn new(sequence: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }
}

/// Lifecycle of one shard processor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardLifecycle {
    Initializing,
    Active,
    ShuttingDown,
    Terminated,
}

/// Why a shard is being shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shard is permanently retired (e.g. fully consumed); the final
    /// cursor is checkpointed so a successor resumes without replay.
    Terminate,
    /// Another worker owns the lease now; the cursor must not be touched.
    LeaseLost,
}

/// Outcome counters for one `process_batch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub alerts: usize,
    pub checkpoint: Option<CheckpointOutcome>,
}

/// Cumulative counters for one shard processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorTelemetry {
    pub records_processed_total: u64,
    pub records_skipped_total: u64,
    pub decode_failures_total: u64,
    pub alerts_emitted_total: u64,
    pub checkpoints_committed_total: u64,
    pub checkpoints_skipped_total: u64,
}

/// Errors surfaced by the shard processor itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("shard {shard_id} is {lifecycle:?} and no longer accepts work")]
    NotAccepting {
        shard_id: String,
        lifecycle: ShardLifecycle,
    },
}

/// Orchestrates one shard: decodes batches in delivery order, feeds the
/// threshold aggregator, forwards alerts, and advances the durable cursor.
///
/// All state is owned exclusively by this instance; concurrent shards each
/// get their own processor, so no locking is needed inside.
pub struct ShardProcessor<S: CheckpointStore, A: AlertSink, B: Backoff> {
    shard_id: String,
    lifecycle: ShardLifecycle,
    aggregator: ThresholdAggregator,
    checkpoints: CheckpointManager<S>,
    retry: RetryExecutor<B>,
    alerts: A,
    cursor: Option<u64>,
    logger: ShardLogger,
    telemetry: ProcessorTelemetry,
}

impl<S: CheckpointStore, A: AlertSink, B: Backoff> ShardProcessor<S, A, B> {
    /// Creates a processor for one shard from the shared configuration.
    pub fn new(
        shard_id: impl Into<String>,
        config: &ProcessorConfig,
        store: S,
        alerts: A,
        backoff: B,
    ) -> Self {
        let shard_id = shard_id.into();
        Self {
            lifecycle: ShardLifecycle::Initializing,
            aggregator: ThresholdAggregator::new(config.threshold, config.alert_after),
            checkpoints: CheckpointManager::new(
                shard_id.clone(),
                store,
                config.checkpoint_interval_ms,
            ),
            retry: RetryExecutor::new(config.retry_policy(), backoff),
            alerts,
            cursor: None,
            logger: ShardLogger::new(shard_id.clone(), LogRotationPolicy::default()),
            telemetry: ProcessorTelemetry::default(),
            shard_id,
        }
    }

    /// Processes one ordered batch. Malformed records are logged and skipped;
    /// records whose delivery exhausts every retry are poison pills and are
    /// skipped too. The batch itself never fails once accepted. When the
    /// checkpoint deadline has passed, the cursor is persisted afterwards.
    pub fn process_batch(
        &mut self,
        records: &[StreamRecord],
        now_ms: u64,
    ) -> Result<BatchSummary, ProcessorError> {
        self.ensure_accepting(now_ms)?;
        let mut summary = BatchSummary::default();
        for record in records {
            match codec::decode(&record.payload) {
                Ok(reading) => match self.apply_reading(&reading, now_ms) {
                    Ok(decision) => {
                        summary.processed += 1;
                        self.telemetry.records_processed_total += 1;
                        if decision == AlertDecision::Alert {
                            summary.alerts += 1;
                            self.telemetry.alerts_emitted_total += 1;
                        }
                    }
                    Err(err) => {
                        summary.skipped += 1;
                        self.telemetry.records_skipped_total += 1;
                        self.log(
                            now_ms,
                            LogLevel::Warn,
                            record.sequence,
                            &format!("skipping poison record: {err}"),
                        );
                    }
                },
                Err(err) => {
                    summary.skipped += 1;
                    self.telemetry.records_skipped_total += 1;
                    self.telemetry.decode_failures_total += 1;
                    self.log(
                        now_ms,
                        LogLevel::Warn,
                        record.sequence,
                        &format!("skipping malformed record: {err}"),
                    );
                }
            }
            // The cursor reflects the furthest position reached, including
            // skipped records: a poison pill must not wedge the shard.
            self.cursor = Some(record.sequence);
        }
        if self.checkpoints.is_due(now_ms) {
            summary.checkpoint = Some(self.flush_checkpoint(now_ms));
        }
        Ok(summary)
    }

    /// Shuts the shard down cooperatively. `Terminate` forces one final
    /// checkpoint regardless of the deadline; `LeaseLost` skips it because a
    /// stale worker must not claim progress it may no longer own.
    pub fn shutdown(
        &mut self,
        reason: ShutdownReason,
        now_ms: u64,
    ) -> Result<Option<CheckpointOutcome>, ProcessorError> {
        if matches!(
            self.lifecycle,
            ShardLifecycle::ShuttingDown | ShardLifecycle::Terminated
        ) {
            return Err(ProcessorError::NotAccepting {
                shard_id: self.shard_id.clone(),
                lifecycle: self.lifecycle,
            });
        }
        self.lifecycle = ShardLifecycle::ShuttingDown;
        let seq = self.cursor.unwrap_or(0);
        self.log(
            now_ms,
            LogLevel::Info,
            seq,
            &format!("shutting down ({reason:?})"),
        );
        let outcome = match reason {
            ShutdownReason::Terminate => Some(self.flush_checkpoint(now_ms)),
            ShutdownReason::LeaseLost => None,
        };
        self.lifecycle = ShardLifecycle::Terminated;
        self.log(now_ms, LogLevel::Info, seq, "terminated");
        Ok(outcome)
    }

    /// Shard identifier this processor owns.
    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> ShardLifecycle {
        self.lifecycle
    }

    /// Furthest sequence position reached so far.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Cumulative counters.
    pub fn telemetry(&self) -> &ProcessorTelemetry {
        &self.telemetry
    }

    /// Aggregate state, for inspection.
    pub fn aggregator(&self) -> &ThresholdAggregator {
        &self.aggregator
    }

    /// Shard-scoped logger, for inspection.
    pub fn logger(&self) -> &ShardLogger {
        &self.logger
    }

    /// Mutable logger access (level overrides).
    pub fn logger_mut(&mut self) -> &mut ShardLogger {
        &mut self.logger
    }

    fn ensure_accepting(&mut self, now_ms: u64) -> Result<(), ProcessorError> {
        match self.lifecycle {
            ShardLifecycle::Initializing => {
                self.lifecycle = ShardLifecycle::Active;
                self.log(now_ms, LogLevel::Info, 0, "shard activated");
                Ok(())
            }
            ShardLifecycle::Active => Ok(()),
            lifecycle => Err(ProcessorError::NotAccepting {
                shard_id: self.shard_id.clone(),
                lifecycle,
            }),
        }
    }

    /// Feeds one reading to the aggregator and delivers any alert through the
    /// retry executor. The breach counter advances exactly once per record
    /// even when delivery to the sink is retried.
    fn apply_reading(
        &mut self,
        reading: &SensorReading,
        now_ms: u64,
    ) -> Result<AlertDecision, RetryError<AlertSinkError>> {
        let Self {
            shard_id,
            aggregator,
            retry,
            alerts,
            ..
        } = self;
        let mut decision = None;
        retry.execute(
            || {
                let current = *decision.get_or_insert_with(|| aggregator.observe(reading));
                if current == AlertDecision::Alert {
                    alerts.publish(AlertSignal {
                        shard_id: shard_id.clone(),
                        sensor_id: reading.sensor_id.clone(),
                        observed_at_ms: now_ms,
                    })?;
                }
                Ok(())
            },
            AlertSinkError::is_transient,
        )?;
        Ok(decision.unwrap_or(AlertDecision::NoAlert))
    }

    fn flush_checkpoint(&mut self, now_ms: u64) -> CheckpointOutcome {
        let Some(cursor) = self.cursor else {
            return CheckpointOutcome::Skipped(CheckpointSkipReason::NoProgress);
        };
        let Self {
            checkpoints, retry, ..
        } = self;
        let outcome = checkpoints.checkpoint(retry, cursor, now_ms);
        match &outcome {
            CheckpointOutcome::Committed(record) => {
                self.telemetry.checkpoints_committed_total += 1;
                self.log(
                    now_ms,
                    LogLevel::Info,
                    record.sequence,
                    "checkpoint committed",
                );
            }
            CheckpointOutcome::Skipped(reason) => {
                self.telemetry.checkpoints_skipped_total += 1;
                self.log(
                    now_ms,
                    LogLevel::Warn,
                    cursor,
                    &format!("checkpoint skipped: {reason:?}"),
                );
            }
        }
        outcome
    }

    fn log(&mut self, ts_ms: u64, level: LogLevel, seq: u64, message: &str) {
        self.logger.log(ts_ms, level, seq, message).ok();
    }
}
