//! Parallel production of document records.
//!
//! Each partition of the input is handed to its own worker thread, which
//! returns a private vector of records. The coordinator gathers the vectors
//! over a channel and concatenates them in partition order, so the result does
//! not depend on which worker finished first. Nothing is shared between
//! workers.
//!
//! By default the coordinator waits for every worker. With a join timeout it
//! stops waiting at the deadline; unfinished partitions are reported in
//! [`CollectionOutcome::timed_out`] and contribute no records.

use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, unbounded};
use serde::{Deserialize, Serialize};

use crate::document::DocumentRecord;
use crate::error::{Result, SpimiError};

/// Configuration for [`RecordCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Stop waiting for workers after this many milliseconds.
    /// `None` waits for all of them.
    pub join_timeout_ms: Option<u64>,
}

impl CollectorConfig {
    /// The join deadline, if any.
    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_ms.map(Duration::from_millis)
    }

    /// Set the join deadline.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

/// Records gathered from all partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOutcome {
    /// Records of completed partitions, in partition order.
    pub records: Vec<DocumentRecord>,
    /// Partitions whose worker finished.
    pub completed: Vec<usize>,
    /// Partitions still running at the deadline.
    pub timed_out: Vec<usize>,
}

impl CollectionOutcome {
    /// Whether every partition contributed its records.
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
    }
}

type WorkerMessage = (usize, thread::Result<Result<Vec<DocumentRecord>>>);

/// Runs one producer per partition and joins their output.
#[derive(Debug, Clone, Default)]
pub struct RecordCollector {
    config: CollectorConfig,
}

impl RecordCollector {
    /// Create a collector.
    pub fn new(config: CollectorConfig) -> Self {
        RecordCollector { config }
    }

    /// The collector's configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run `producer` on every partition in parallel.
    ///
    /// A producer error or panic fails the whole collection.
    pub fn collect<P, F>(&self, partitions: Vec<P>, producer: F) -> Result<CollectionOutcome>
    where
        P: Send + 'static,
        F: Fn(P) -> Result<Vec<DocumentRecord>> + Send + Sync + 'static,
    {
        let partition_count = partitions.len();
        let producer = Arc::new(producer);
        let (tx, rx) = unbounded::<WorkerMessage>();

        let mut handles = Vec::with_capacity(partition_count);
        for (index, partition) in partitions.into_iter().enumerate() {
            let tx = tx.clone();
            let producer = Arc::clone(&producer);
            let handle = thread::Builder::new()
                .name(format!("spimi-collect-{index}"))
                .spawn(move || {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        producer(partition)
                    }));
                    // The coordinator may have stopped listening after a deadline.
                    let _ = tx.send((index, result));
                })?;
            handles.push(handle);
        }
        drop(tx);

        // A timeout too large to represent as an instant behaves as no timeout.
        let deadline = self
            .config
            .join_timeout()
            .and_then(|t| Instant::now().checked_add(t));
        let mut slots: Vec<Option<Vec<DocumentRecord>>> = vec![None; partition_count];
        let mut received = 0;

        while received < partition_count {
            let message = match deadline {
                None => rx
                    .recv()
                    .map_err(|_| SpimiError::internal("collector workers disconnected"))?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(remaining) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => {
                            return Err(SpimiError::internal("collector workers disconnected"));
                        }
                    }
                }
            };

            let (partition, result) = message;
            received += 1;
            match result {
                Ok(Ok(records)) => {
                    tracing::debug!(partition, records = records.len(), "partition collected");
                    slots[partition] = Some(records);
                }
                Ok(Err(e)) => {
                    return Err(SpimiError::Worker {
                        partition,
                        message: e.to_string(),
                    });
                }
                Err(payload) => {
                    return Err(SpimiError::ThreadJoinError(format!(
                        "worker for partition {partition} panicked: {}",
                        panic_message(payload.as_ref())
                    )));
                }
            }
        }

        if received == partition_count {
            for handle in handles {
                handle
                    .join()
                    .map_err(|payload| SpimiError::ThreadJoinError(panic_message(payload.as_ref())))?;
            }
        }

        let mut outcome = CollectionOutcome::default();
        for (partition, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(records) => {
                    outcome.records.extend(records);
                    outcome.completed.push(partition);
                }
                None => outcome.timed_out.push(partition),
            }
        }

        if !outcome.timed_out.is_empty() {
            tracing::warn!(
                timed_out = ?outcome.timed_out,
                completed = outcome.completed.len(),
                "join deadline passed; proceeding without unfinished partitions"
            );
        }

        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
