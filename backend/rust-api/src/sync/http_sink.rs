use async_trait::async_trait;

use super::{ProgressRecord, ProgressSink};
use crate::client::{ApiClient, ClientError};

/// Posts records to `POST /api/progress`. The response body is ignored.
#[derive(Debug, Clone)]
pub struct HttpProgressSink {
    client: ApiClient,
}

impl HttpProgressSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressSink for HttpProgressSink {
    async fn send(&self, record: &ProgressRecord) -> Result<(), ClientError> {
        self.client.post_progress(&record.to_request()).await?;
        Ok(())
    }
}
