use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use super::ClientError;
use crate::models::{
    progress::{ProgressEntry, ProgressRequest},
    user::{LoginRequest, RegisterRequest},
};

/// HTTP client for the quest backend (`/api/login`, `/api/register`,
/// `/api/progress`).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the backend's (opaque) user document on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        self.call_api(&["api", "login"], &body).await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ClientError> {
        let body = RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        self.call_api(&["api", "register"], &body).await
    }

    pub async fn post_progress(&self, body: &ProgressRequest) -> Result<Value, ClientError> {
        self.call_api(&["api", "progress"], body).await
    }

    pub async fn fetch_progress(&self, email: &str) -> Result<Vec<ProgressEntry>, ClientError> {
        let url = self.endpoint(&["api", "progress", email])?;
        let response = self.http.get(url).send().await?;
        let value = read_json(response).await?;
        serde_json::from_value(value).map_err(|_| ClientError::InvalidJson)
    }

    async fn call_api<B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        payload: &B,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.post(url).json(payload).send().await?;
        read_json(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Reads a response body as JSON. An empty body counts as `{}`; anything
/// else that is not JSON is an error, as is any non-2xx status.
async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    let raw = response.text().await?;

    let data = if raw.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(status = %status, body = %raw, "Failed to parse JSON: {}", e);
                return Err(ClientError::InvalidJson);
            }
        }
    };

    if !status.is_success() {
        return Err(ClientError::Api {
            status,
            message: error_message(data.as_ref(), &raw, status),
        });
    }

    Ok(data.unwrap_or_else(|| Value::Object(Default::default())))
}

/// Picks the most useful message out of an error response.
fn error_message(data: Option<&Value>, raw: &str, status: StatusCode) -> String {
    let field = |name: &str| {
        data.and_then(|d| d.get(name))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    field("error")
        .or_else(|| field("message"))
        .or_else(|| (!raw.trim().is_empty()).then(|| raw.to_string()))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_error_then_message() {
        let status = StatusCode::UNAUTHORIZED;
        let both = json!({ "error": "invalid credentials", "message": "nope" });
        assert_eq!(
            error_message(Some(&both), "", status),
            "invalid credentials"
        );
        let message_only = json!({ "message": "nope" });
        assert_eq!(error_message(Some(&message_only), "", status), "nope");
    }

    #[test]
    fn error_message_falls_back_to_body_then_status() {
        let status = StatusCode::BAD_GATEWAY;
        assert_eq!(error_message(Some(&json!([1])), "[1]", status), "[1]");
        assert_eq!(error_message(None, "", status), "Bad Gateway");
        assert_eq!(
            error_message(None, "", StatusCode::from_u16(599).unwrap()),
            "Request failed"
        );
    }

    #[test]
    fn endpoints_are_joined_and_escaped() {
        let client = ApiClient::new("http://localhost:7000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["api", "login"]).unwrap().as_str(),
            "http://localhost:7000/api/login"
        );
        assert_eq!(
            client
                .endpoint(&["api", "progress", "a b@c.com"])
                .unwrap()
                .as_str(),
            "http://localhost:7000/api/progress/a%20b@c.com"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url", Duration::from_secs(1)),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }
}
