use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::metrics::{track_db_operation, AUTH_ATTEMPTS_TOTAL};
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User};
use crate::storage::{QuestStore, StorageError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email and password required")]
    MissingCredentials,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateEmail => AuthError::EmailTaken,
            other => AuthError::Internal(other.into()),
        }
    }
}

pub struct AuthService {
    store: Arc<dyn QuestStore>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn QuestStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let result = self.register_inner(req).await;
        record_attempt("register", &result);
        result
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let result = self.login_inner(req).await;
        record_attempt("login", &result);
        result
    }

    async fn register_inner(&self, req: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let (email, password) = required(req.email.as_deref(), req.password.as_deref())?;
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let existing = track_db_operation(
            "find_one",
            "users",
            self.store.find_user_by_email(email),
        )
        .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(password).await?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: req.username.clone().unwrap_or_default(),
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        let id = user.id.clone();

        track_db_operation("insert_one", "users", self.store.insert_user(user)).await?;

        tracing::info!(user_id = %id, email = %email, "User registered");
        Ok(RegisterResponse {
            id,
            message: "created".to_string(),
        })
    }

    async fn login_inner(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let (email, password) = required(req.email.as_deref(), req.password.as_deref())?;

        let user = track_db_operation(
            "find_one",
            "users",
            self.store.find_user_by_email(email),
        )
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!(email = %email, "Failed login attempt: invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, email = %email, "Successful login");
        Ok(LoginResponse::from(user))
    }

    /// bcrypt runs on the blocking pool
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")
    }

    async fn verify_password(&self, password: &str, hash: &str) -> anyhow::Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?
            .context("Failed to verify password")
    }
}

fn required<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(&'a str, &'a str), AuthError> {
    match (email, password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(AuthError::MissingCredentials),
    }
}

fn record_attempt<T>(action: &str, result: &Result<T, AuthError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(AuthError::Internal(_)) => "error",
        Err(_) => "rejected",
    };
    AUTH_ATTEMPTS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), 4)
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some("CodeWarrior".into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let service = service();
        let created = service
            .register(register_request("a@b.com", "hunter22"))
            .await
            .unwrap();
        assert_eq!(created.message, "created");

        let user = service
            .login(LoginRequest {
                email: Some("a@b.com".into()),
                password: Some("hunter22".into()),
            })
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(user.username, "CodeWarrior");
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let service = service();
        service
            .register(register_request("a@b.com", "pw"))
            .await
            .unwrap();
        assert!(matches!(
            service.register(register_request("a@b.com", "pw2")).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn missing_and_invalid_fields() {
        let service = service();
        assert!(matches!(
            service.register(RegisterRequest::default()).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            service.register(register_request("not-an-email", "pw")).await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service
                .login(LoginRequest {
                    email: Some("a@b.com".into()),
                    password: None,
                })
                .await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let service = service();
        service
            .register(register_request("a@b.com", "right"))
            .await
            .unwrap();

        for (email, password) in [("a@b.com", "wrong"), ("nobody@b.com", "right")] {
            let err = service
                .login(LoginRequest {
                    email: Some(email.into()),
                    password: Some(password.into()),
                })
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "invalid credentials");
        }
    }
}
