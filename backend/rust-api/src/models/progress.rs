use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/progress`.
///
/// `data` is the JSON-encoded attempt, sent as a string. `seq` orders
/// updates for the same quest; older ones are ignored by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub quest_id: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub id: String,
    pub message: String,
}

/// Progress row stored in the "quest_progress" collection, one per
/// (email, quest_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub quest_id: String,
    pub progress: f64,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Validated update handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub email: String,
    pub quest_id: String,
    pub progress: f64,
    pub data: String,
    pub seq: Option<i64>,
}

/// Entry of the progress view (`GET /api/progress/{email}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub quest_id: String,
    pub progress: f64,
    pub data: String,
    pub updated_at: DateTime<Utc>,
}

impl From<QuestProgress> for ProgressEntry {
    fn from(row: QuestProgress) -> Self {
        ProgressEntry {
            quest_id: row.quest_id,
            progress: row.progress,
            data: row.data,
            updated_at: row.updated_at,
        }
    }
}
