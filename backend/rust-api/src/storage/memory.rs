use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{seq_accepts, QuestStore, StorageError, UpsertOutcome};
use crate::models::{
    progress::{ProgressUpdate, QuestProgress},
    user::User,
};

/// Process-local store used for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    // keyed by (email, quest_id); BTreeMap keeps listings sorted
    progress: RwLock<BTreeMap<(String, String), QuestProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StorageError::DuplicateEmail);
        }
        users.insert(user.email.clone(), user);
        Ok(())
    }

    async fn upsert_progress(&self, update: ProgressUpdate) -> Result<UpsertOutcome, StorageError> {
        let mut progress = self.progress.write().await;
        let key = (update.email.clone(), update.quest_id.clone());

        match progress.get_mut(&key) {
            Some(row) if !seq_accepts(row.seq, update.seq) => Ok(UpsertOutcome::Stale {
                id: row.id.clone(),
            }),
            Some(row) => {
                row.progress = update.progress;
                row.data = update.data;
                if update.seq.is_some() {
                    row.seq = update.seq;
                }
                row.updated_at = Utc::now();
                Ok(UpsertOutcome::Applied { id: row.id.clone() })
            }
            None => {
                let id = Uuid::new_v4().to_string();
                progress.insert(
                    key,
                    QuestProgress {
                        id: id.clone(),
                        email: update.email,
                        quest_id: update.quest_id,
                        progress: update.progress,
                        data: update.data,
                        seq: update.seq,
                        updated_at: Utc::now(),
                    },
                );
                Ok(UpsertOutcome::Applied { id })
            }
        }
    }

    async fn list_progress(&self, email: &str) -> Result<Vec<QuestProgress>, StorageError> {
        Ok(self
            .progress
            .read()
            .await
            .values()
            .filter(|row| row.email == email)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
