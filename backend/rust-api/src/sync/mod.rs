//! Best-effort reporting of quest progress to the backend.
//!
//! Records are fire-and-forget: failures are logged, never retried, and
//! never affect the local quest state.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::client::ClientError;
use crate::models::progress::ProgressRequest;

pub mod http_sink;
pub mod progress_sync;

pub use http_sink::HttpProgressSink;
pub use progress_sync::ProgressSync;

/// Snapshot of one exercise's progress for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub identifier: String,
    pub exercise_key: String,
    pub percentage: u8,
    pub payload: String,
    pub seq: u64,
}

impl ProgressRecord {
    pub fn to_request(&self) -> ProgressRequest {
        ProgressRequest {
            email: Some(self.identifier.clone()),
            quest_id: Some(self.exercise_key.clone()),
            progress: f64::from(self.percentage),
            data: Some(self.payload.clone()),
            seq: Some(self.seq),
        }
    }
}

/// Receives progress from the quest board.
pub trait ProgressReporter {
    /// A mutation changed the attempt. May be coalesced with later reports
    /// for the same exercise.
    fn report(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String);

    /// Must be delivered as-is (used by "Mark Complete").
    fn report_now(&self, identifier: &str, exercise_key: &str, percentage: u8, payload: String);

    /// The exercise was closed; nothing more will be reported for it until
    /// it is reopened.
    fn exercise_closed(&self, exercise_key: &str);
}

/// Where progress records end up.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, record: &ProgressRecord) -> Result<(), ClientError>;
}

/// Hands out strictly increasing sequence numbers, anchored to wall-clock
/// milliseconds so that numbers keep increasing across restarts.
#[derive(Debug, Default)]
pub struct SequenceClock {
    last: AtomicU64,
}

impl SequenceClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let advance = |last: u64| last.saturating_add(1).max(now);
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
            .unwrap_or_else(|last| last);
        advance(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_strictly_increasing() {
        let clock = SequenceClock::new();
        let mut last = 0;
        for _ in 0..1000 {
            let seq = clock.next();
            assert!(seq > last);
            last = seq;
        }
    }

    #[test]
    fn record_to_wire_request() {
        let record = ProgressRecord {
            identifier: "a@b.com".into(),
            exercise_key: "typing-java-0".into(),
            percentage: 42,
            payload: r#"{"typed":"for"}"#.into(),
            seq: 7,
        };
        let body = serde_json::to_value(record.to_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "email": "a@b.com",
                "questId": "typing-java-0",
                "progress": 42.0,
                "data": "{\"typed\":\"for\"}",
                "seq": 7
            })
        );
    }
}
