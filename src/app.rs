use crate::alert::AlertBus;
use crate::checkpoint::MemoryCheckpointStore;
use crate::config::ProcessorConfig;
use crate::generator::ReadingGenerator;
use crate::processor::ShutdownReason;
use crate::worker::ShardWorker;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "SHARDWATCH_CONFIG";

const DEMO_SHARD_ID: &str = "shardId-000000000000";
const DEMO_BATCHES: usize = 8;
const DEMO_BATCH_LEN: usize = 25;

/// Demo harness: drives generated sensor batches through one shard worker
/// backed by an in-process checkpoint store, then retires the shard with a
/// terminal checkpoint and reports what happened.
pub fn run() -> Result<()> {
    let config = load_config()?;
    let store = MemoryCheckpointStore::new();
    let (bus, alerts) = AlertBus::unbounded();
    let worker = ShardWorker::spawn(DEMO_SHARD_ID, &config, store.clone(), bus);

    let mut generator = ReadingGenerator::new(7);
    let mut sequence = 0u64;
    for _ in 0..DEMO_BATCHES {
        let batch = generator.batch(sequence, DEMO_BATCH_LEN);
        sequence += DEMO_BATCH_LEN as u64;
        if let Err(err) = worker.submit_batch(batch) {
            // The worker still holds accepted batches; retire it before
            // surfacing the submit failure so the thread is not leaked.
            worker.shutdown(ShutdownReason::Terminate);
            worker.join().ok();
            return Err(anyhow!("submitting batch: {err}"));
        }
    }

    worker.shutdown(ShutdownReason::Terminate);
    let report = worker
        .join()
        .map_err(|err| anyhow!("waiting for shard worker: {err}"))?;

    for alert in alerts.drain() {
        println!(
            "ALERT shard={} sensor={} at={}ms",
            alert.shard_id, alert.sensor_id, alert.observed_at_ms
        );
    }
    println!(
        "shard {} finished: {} processed, {} skipped, {} alerts, cursor={:?}",
        report.shard_id,
        report.telemetry.records_processed_total,
        report.telemetry.records_skipped_total,
        report.telemetry.alerts_emitted_total,
        store.committed(DEMO_SHARD_ID).map(|record| record.sequence),
    );
    Ok(())
}

fn load_config() -> Result<ProcessorConfig> {
    match env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.to_string_lossy()))?;
            ProcessorConfig::from_json(&text).context("parsing processor config")
        }
        None => Ok(ProcessorConfig::default()),
    }
}
