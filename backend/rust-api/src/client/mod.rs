//! Client side of the quest backend: HTTP API calls and the locally
//! remembered player identity.

use reqwest::StatusCode;
use thiserror::Error;

pub mod api_client;
pub mod identity;

pub use api_client::ApiClient;
pub use identity::{IdentityError, IdentityStore, PlayerSession};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url: {0}")]
    InvalidBaseUrl(String),
    #[error("Server returned invalid JSON. Check backend logs for details.")]
    InvalidJson,
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}
