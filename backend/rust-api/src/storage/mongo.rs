use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use uuid::Uuid;

use super::{QuestStore, StorageError, UpsertOutcome};
use crate::models::{
    progress::{ProgressUpdate, QuestProgress},
    user::User,
};

const USERS: &str = "users";
const QUEST_PROGRESS: &str = "quest_progress";

pub struct MongoStore {
    mongo: Database,
}

impl MongoStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Creates the unique indexes the upsert logic relies on (idempotent).
    pub async fn ensure_indexes(&self) -> Result<(), StorageError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.progress()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1, "quest_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection(USERS)
    }

    fn progress(&self) -> Collection<QuestProgress> {
        self.mongo.collection(QUEST_PROGRESS)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref we)) => we.code == 11000,
        ErrorKind::Command(ref ce) => ce.code == 11000,
        _ => false,
    }
}

#[async_trait]
impl QuestStore for MongoStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn insert_user(&self, user: User) -> Result<(), StorageError> {
        match self.users().insert_one(&user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StorageError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_progress(&self, update: ProgressUpdate) -> Result<UpsertOutcome, StorageError> {
        // The seq condition lives in the filter: a stale update fails to
        // match the existing row, and the attempted insert then hits the
        // unique (email, quest_id) index. So does the loser of two
        // concurrent inserts of a new row.
        let mut filter = doc! { "email": &update.email, "quest_id": &update.quest_id };
        let mut set = doc! {
            "progress": update.progress,
            "data": &update.data,
            "updated_at": bson::DateTime::now(),
        };
        if let Some(seq) = update.seq {
            filter.insert(
                "$or",
                vec![doc! { "seq": { "$lte": seq } }, doc! { "seq": null }],
            );
            set.insert("seq", seq);
        }
        let change = doc! {
            "$set": set,
            "$setOnInsert": { "_id": Uuid::new_v4().to_string() },
        };

        let result = self
            .progress()
            .find_one_and_update(filter.clone(), change.clone())
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(Some(row)) => Ok(UpsertOutcome::Applied { id: row.id }),
            Ok(None) => Err(StorageError::Backend(
                "progress upsert returned no document".to_string(),
            )),
            Err(e) if is_duplicate_key(&e) => {
                // Either a newer row exists, or a concurrent upsert created
                // the row first. Retry as a plain update to tell them apart.
                let retried = self
                    .progress()
                    .find_one_and_update(filter, change)
                    .return_document(ReturnDocument::After)
                    .await?;
                if let Some(row) = retried {
                    return Ok(UpsertOutcome::Applied { id: row.id });
                }

                let existing: Option<Document> = self
                    .mongo
                    .collection::<Document>(QUEST_PROGRESS)
                    .find_one(doc! { "email": &update.email, "quest_id": &update.quest_id })
                    .await?;
                let id = existing
                    .as_ref()
                    .and_then(|d| d.get_str("_id").ok())
                    .unwrap_or_default()
                    .to_string();
                tracing::debug!(
                    email = %update.email,
                    quest_id = %update.quest_id,
                    "Ignoring out-of-order progress update"
                );
                Ok(UpsertOutcome::Stale { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_progress(&self, email: &str) -> Result<Vec<QuestProgress>, StorageError> {
        let cursor = self
            .progress()
            .find(doc! { "email": email })
            .sort(doc! { "quest_id": 1 })
            .await?;
        let rows: Vec<QuestProgress> = cursor.try_collect().await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.mongo.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}
