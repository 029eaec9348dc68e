use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
    time::Instant,
};

use super::{ProgressRecord, ProgressReporter, ProgressSink, SequenceClock};
use crate::metrics::{SYNC_REQUESTS_TOTAL, SYNC_UPDATES_COALESCED_TOTAL};

enum Command {
    Debounced(ProgressRecord),
    Immediate(ProgressRecord),
    Flush(String),
}

struct Pending {
    record: ProgressRecord,
    due: Instant,
}

/// Fire-and-forget progress reporter.
///
/// Records are keyed by (identifier, exercise). Within the debounce window
/// only the newest record per key is kept and sent once the key has been
/// quiet for the whole window. A zero window sends every record. Sends run
/// concurrently and are never cancelled; ordering on the server side relies
/// on the record's `seq`.
///
/// Must be created inside a tokio runtime.
pub struct ProgressSync {
    commands: mpsc::UnboundedSender<Command>,
    clock: SequenceClock,
    worker: JoinHandle<()>,
}

impl ProgressSync {
    pub fn spawn(sink: Arc<dyn ProgressSink>, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, sink, debounce));
        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "Progress sync started");
        Self {
            commands,
            clock: SequenceClock::new(),
            worker,
        }
    }

    /// Queues a progress record. Does nothing for an empty identifier.
    pub fn sync_progress(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String) {
        if let Some(record) = self.record(identifier, exercise_key, percentage, payload) {
            self.submit(Command::Debounced(record));
        }
    }

    /// Sends a record right away, superseding anything pending for the
    /// same exercise.
    pub fn sync_now(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String) {
        if let Some(record) = self.record(identifier, exercise_key, percentage, payload) {
            self.submit(Command::Immediate(record));
        }
    }

    /// Sends whatever is pending for the exercise without waiting for the
    /// debounce window.
    pub fn flush(&self, exercise_key: &str) {
        self.submit(Command::Flush(exercise_key.to_string()));
    }

    /// Sends everything still pending and waits for in-flight requests.
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Progress sync worker ended abnormally");
        }
    }

    fn record(
        &self,
        identifier: &str,
        exercise_key: &str,
        percentage: u8,
        payload: String,
    ) -> Option<ProgressRecord> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            SYNC_REQUESTS_TOTAL.with_label_values(&["skipped"]).inc();
            tracing::trace!(exercise = %exercise_key, "No player identifier, progress not synced");
            return None;
        }
        Some(ProgressRecord {
            identifier: identifier.to_string(),
            exercise_key: exercise_key.to_string(),
            percentage: percentage.min(100),
            payload,
            seq: self.clock.next(),
        })
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Progress sync worker is gone, dropping progress record");
        }
    }
}

impl ProgressReporter for ProgressSync {
    fn report(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String) {
        self.sync_progress(identifier, exercise_key, percentage, payload);
    }

    fn report_now(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String) {
        self.sync_now(identifier, exercise_key, percentage, payload);
    }

    fn exercise_closed(&self, exercise_key: &str) {
        self.flush(exercise_key);
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Command>,
    sink: Arc<dyn ProgressSink>,
    debounce: Duration,
) {
    let mut pending: HashMap<(String, String), Pending> = HashMap::new();
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        let next_due = pending.values().map(|p| p.due).min();

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Debounced(record)) if debounce.is_zero() => {
                    dispatch(&mut in_flight, &sink, record);
                }
                Some(Command::Debounced(record)) => {
                    let key = (record.identifier.clone(), record.exercise_key.clone());
                    let due = Instant::now() + debounce;
                    if pending.insert(key, Pending { record, due }).is_some() {
                        SYNC_UPDATES_COALESCED_TOTAL.inc();
                    }
                }
                Some(Command::Immediate(record)) => {
                    let key = (record.identifier.clone(), record.exercise_key.clone());
                    if pending.remove(&key).is_some() {
                        SYNC_UPDATES_COALESCED_TOTAL.inc();
                    }
                    dispatch(&mut in_flight, &sink, record);
                }
                Some(Command::Flush(exercise_key)) => {
                    let keys: Vec<_> = pending
                        .keys()
                        .filter(|(_, key)| *key == exercise_key)
                        .cloned()
                        .collect();
                    for key in keys {
                        if let Some(p) = pending.remove(&key) {
                            dispatch(&mut in_flight, &sink, p.record);
                        }
                    }
                }
                None => break,
            },
            _ = wait_until(next_due) => {
                let now = Instant::now();
                let due: Vec<_> = pending
                    .iter()
                    .filter(|(_, p)| p.due <= now)
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in due {
                    if let Some(p) = pending.remove(&key) {
                        dispatch(&mut in_flight, &sink, p.record);
                    }
                }
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join(joined);
            },
        }
    }

    let mut remaining: Vec<_> = pending.into_values().map(|p| p.record).collect();
    remaining.sort_by_key(|record| record.seq);
    for record in remaining {
        dispatch(&mut in_flight, &sink, record);
    }
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }
    tracing::debug!("Progress sync stopped");
}

fn dispatch(in_flight: &mut JoinSet<()>, sink: &Arc<dyn ProgressSink>, record: ProgressRecord) {
    let sink = Arc::clone(sink);
    in_flight.spawn(async move {
        match sink.send(&record).await {
            Ok(()) => {
                SYNC_REQUESTS_TOTAL.with_label_values(&["sent"]).inc();
                tracing::debug!(
                    quest_id = %record.exercise_key,
                    progress = record.percentage,
                    seq = record.seq,
                    "Progress saved"
                );
            }
            Err(e) => {
                SYNC_REQUESTS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(
                    quest_id = %record.exercise_key,
                    error = %e,
                    "Failed to save progress"
                );
            }
        }
    });
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "Progress sync request task failed");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
