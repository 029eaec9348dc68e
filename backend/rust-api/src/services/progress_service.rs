use std::sync::Arc;

use thiserror::Error;

use crate::metrics::{track_db_operation, PROGRESS_UPDATES_TOTAL};
use crate::models::progress::{ProgressEntry, ProgressRequest, ProgressResponse, ProgressUpdate};
use crate::storage::{QuestStore, StorageError, UpsertOutcome};

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("email and questId required")]
    MissingFields,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct ProgressService {
    store: Arc<dyn QuestStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn QuestStore>) -> Self {
        Self { store }
    }

    /// Upserts the (email, questId) row. Out-of-order updates are
    /// acknowledged with message "stale" and change nothing.
    pub async fn save_progress(&self, req: ProgressRequest) -> Result<ProgressResponse, ProgressError> {
        let update = to_update(req)?;
        tracing::debug!(
            email = %update.email,
            quest_id = %update.quest_id,
            progress = update.progress,
            seq = ?update.seq,
            "Saving progress"
        );

        let outcome = track_db_operation(
            "upsert",
            "quest_progress",
            self.store.upsert_progress(update),
        )
        .await?;

        let message = match &outcome {
            UpsertOutcome::Applied { .. } => "ok",
            UpsertOutcome::Stale { .. } => "stale",
        };
        PROGRESS_UPDATES_TOTAL
            .with_label_values(&[if message == "ok" { "applied" } else { "stale" }])
            .inc();

        Ok(ProgressResponse {
            id: outcome.id().to_string(),
            message: message.to_string(),
        })
    }

    pub async fn list_progress(&self, email: &str) -> Result<Vec<ProgressEntry>, ProgressError> {
        let rows = track_db_operation(
            "find",
            "quest_progress",
            self.store.list_progress(email),
        )
        .await?;
        Ok(rows.into_iter().map(ProgressEntry::from).collect())
    }
}

fn to_update(req: ProgressRequest) -> Result<ProgressUpdate, ProgressError> {
    let (email, quest_id) = match (req.email, req.quest_id) {
        (Some(email), Some(quest_id)) if !email.is_empty() && !quest_id.is_empty() => {
            (email, quest_id)
        }
        _ => return Err(ProgressError::MissingFields),
    };

    let progress = if req.progress.is_finite() {
        req.progress.clamp(0.0, 100.0)
    } else {
        0.0
    };

    Ok(ProgressUpdate {
        email,
        quest_id,
        progress,
        data: req.data.unwrap_or_else(|| "null".to_string()),
        seq: req.seq.map(|seq| i64::try_from(seq).unwrap_or(i64::MAX)),
    })
}
