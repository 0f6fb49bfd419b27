use shardwatch::{
    Backoff, CheckpointError, CheckpointManager, CheckpointOutcome, CheckpointSkipReason,
    CheckpointStore, CursorRecord, MemoryCheckpointStore, RetryExecutor, RetryPolicy,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Default)]
struct RecordingBackoff {
    waits: Rc<RefCell<Vec<u64>>>,
}

impl Backoff for RecordingBackoff {
    fn wait(&mut self, delay_ms: u64) {
        self.waits.borrow_mut().push(delay_ms);
    }
}

#[derive(Clone, Default)]
struct ScriptedStore {
    commits: Rc<RefCell<Vec<CursorRecord>>>,
    attempts: Rc<RefCell<u32>>,
    failures: Rc<RefCell<VecDeque<CheckpointError>>>,
}

impl ScriptedStore {
    fn failing_with(failures: impl IntoIterator<Item = CheckpointError>) -> Self {
        let store = Self::default();
        store.failures.borrow_mut().extend(failures);
        store
    }
}

impl CheckpointStore for ScriptedStore {
    fn commit(&mut self, record: CursorRecord) -> Result<(), CheckpointError> {
        *self.attempts.borrow_mut() += 1;
        if let Some(err) = self.failures.borrow_mut().pop_front() {
            return Err(err);
        }
        self.commits.borrow_mut().push(record);
        Ok(())
    }
}

fn retry(max_attempts: u32) -> (RetryExecutor<RecordingBackoff>, Rc<RefCell<Vec<u64>>>) {
    let backoff = RecordingBackoff::default();
    let waits = backoff.waits.clone();
    let policy = RetryPolicy {
        max_attempts,
        backoff_delay_ms: 3_000,
    };
    (RetryExecutor::new(policy, backoff), waits)
}

#[test]
fn commits_cursor_and_reschedules_deadline() {
    let store = ScriptedStore::default();
    let commits = store.commits.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, _) = retry(10);

    assert!(manager.is_due(1), "first deadline is immediately due");
    let outcome = manager.checkpoint(&mut executor, 41, 1_000);
    assert!(matches!(outcome, CheckpointOutcome::Committed(_)));
    assert_eq!(manager.committed_sequence(), Some(41));
    assert_eq!(commits.borrow().len(), 1);
    assert_eq!(commits.borrow()[0].sequence, 41);
    assert!(!manager.is_due(30_000));
    assert!(manager.is_due(61_001));
}

#[test]
fn throttling_is_retried_until_success() {
    // Scenario: two transient failures, success on the third attempt.
    let store = ScriptedStore::failing_with([
        CheckpointError::Throttled("slow down".into()),
        CheckpointError::Throttled("slow down".into()),
    ]);
    let attempts = store.attempts.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, waits) = retry(10);

    let outcome = manager.checkpoint(&mut executor, 7, 500);
    assert!(matches!(outcome, CheckpointOutcome::Committed(_)));
    assert_eq!(*attempts.borrow(), 3);
    assert_eq!(*waits.borrow(), vec![3_000, 3_000]);
}

#[test]
fn ownership_loss_is_never_retried() {
    let store = ScriptedStore::failing_with([CheckpointError::OwnershipLost]);
    let attempts = store.attempts.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, waits) = retry(10);

    let outcome = manager.checkpoint(&mut executor, 7, 500);
    assert_eq!(
        outcome,
        CheckpointOutcome::Skipped(CheckpointSkipReason::OwnershipLost)
    );
    assert_eq!(*attempts.borrow(), 1);
    assert!(waits.borrow().is_empty());
    assert_eq!(manager.committed_sequence(), None);
    assert!(!manager.is_due(2_000), "skip reschedules the deadline too");
}

#[test]
fn invalid_state_is_skipped_without_retry() {
    let store = ScriptedStore::failing_with([CheckpointError::InvalidState("bad table".into())]);
    let attempts = store.attempts.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, _) = retry(10);

    let outcome = manager.checkpoint(&mut executor, 7, 500);
    assert_eq!(
        outcome,
        CheckpointOutcome::Skipped(CheckpointSkipReason::InvalidState)
    );
    assert_eq!(*attempts.borrow(), 1);
}

#[test]
fn persistent_throttling_exhausts_retries() {
    let store = ScriptedStore::failing_with(
        std::iter::repeat(CheckpointError::Throttled("busy".into())).take(5),
    );
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, waits) = retry(3);

    let outcome = manager.checkpoint(&mut executor, 7, 500);
    assert_eq!(
        outcome,
        CheckpointOutcome::Skipped(CheckpointSkipReason::RetriesExhausted)
    );
    assert_eq!(waits.borrow().len(), 2);
    // The deadline still moved: the store is probed once per interval.
    assert!(!manager.is_due(2_000));
    assert!(manager.is_due(60_501));
}

#[test]
fn stale_cursor_is_refused() {
    let store = ScriptedStore::default();
    let attempts = store.attempts.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, _) = retry(10);

    manager.checkpoint(&mut executor, 10, 100);
    let outcome = manager.checkpoint(&mut executor, 5, 200);
    assert_eq!(
        outcome,
        CheckpointOutcome::Skipped(CheckpointSkipReason::StaleCursor)
    );
    // No second store call.
    assert_eq!(*attempts.borrow(), 1);
    assert_eq!(manager.committed_sequence(), Some(10));
}

#[test]
fn equal_cursor_recommits_without_regression() {
    let store = ScriptedStore::default();
    let commits = store.commits.clone();
    let mut manager = CheckpointManager::new("shard-1", store, 60_000);
    let (mut executor, _) = retry(10);

    manager.checkpoint(&mut executor, 10, 100);
    let outcome = manager.checkpoint(&mut executor, 10, 200);
    assert!(matches!(outcome, CheckpointOutcome::Committed(_)));
    assert_eq!(commits.borrow().len(), 2);
}

#[test]
fn cursor_records_carry_verifiable_checksums() {
    let record = CursorRecord::new("shard-1", 99, 12_345);
    assert!(record.verify());
    let mut tampered = record.clone();
    tampered.sequence = 100;
    assert!(!tampered.verify());
}

#[test]
fn memory_store_round_trips_by_shard() {
    let mut store = MemoryCheckpointStore::new();
    store
        .commit(CursorRecord::new("shard-1", 5, 10))
        .expect("commit succeeds");
    store
        .commit(CursorRecord::new("shard-2", 9, 20))
        .expect("commit succeeds");
    let loaded = store.committed("shard-1").expect("record present");
    assert_eq!(loaded.sequence, 5);
    assert!(loaded.verify());
    assert_eq!(store.committed("shard-2").expect("record present").sequence, 9);
}

#[test]
fn memory_store_rejects_tampered_records() {
    let mut store = MemoryCheckpointStore::new();
    let mut record = CursorRecord::new("shard-1", 5, 10);
    record.checksum = "deadbeef".into();
    assert!(matches!(
        store.commit(record),
        Err(CheckpointError::InvalidState(_))
    ));
}
