//! Persistence for users and quest progress.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    progress::{ProgressUpdate, QuestProgress},
    user::User,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result of a progress upsert. `Stale` means a newer update for the same
/// quest was already stored and the row was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied { id: String },
    Stale { id: String },
}

impl UpsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            UpsertOutcome::Applied { id } | UpsertOutcome::Stale { id } => id,
        }
    }
}

#[async_trait]
pub trait QuestStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Inserts a user; fails with `DuplicateEmail` when the email is taken.
    async fn insert_user(&self, user: User) -> Result<(), StorageError>;

    /// Creates or updates the row for `(email, quest_id)`. An update whose
    /// `seq` is lower than the stored one is not applied.
    async fn upsert_progress(&self, update: ProgressUpdate) -> Result<UpsertOutcome, StorageError>;

    /// All progress rows of a user, ordered by quest id.
    async fn list_progress(&self, email: &str) -> Result<Vec<QuestProgress>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}

/// Whether an update carrying `incoming` may overwrite a row holding
/// `stored`. Updates without a sequence number always apply.
pub(crate) fn seq_accepts(stored: Option<i64>, incoming: Option<i64>) -> bool {
    match (stored, incoming) {
        (Some(stored), Some(incoming)) => incoming >= stored,
        _ => true,
    }
}
