use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The player the quest board reports progress for. Anonymous players can
/// play, but nothing is synced for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl PlayerSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A blank email yields an anonymous session.
    pub fn signed_in(email: impl Into<String>) -> Self {
        let email = email.into().trim().to_string();
        Self {
            email: (!email.is_empty()).then_some(email),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Identifier sent with progress records; empty when anonymous.
    pub fn identifier(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.email.is_none()
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access identity file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("identity file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Remembers the last signed-in player between runs. This is the only
/// durable client-side state.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means nobody signed in yet.
    pub fn load(&self) -> Result<PlayerSession, IdentityError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(PlayerSession::anonymous())
            }
            Err(source) => {
                return Err(IdentityError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let session: PlayerSession =
            serde_json::from_str(&raw).map_err(|source| IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        // re-normalize in case the file was edited by hand
        Ok(session
            .email()
            .map(PlayerSession::signed_in)
            .unwrap_or_default())
    }

    /// Called on login/registration.
    pub fn save(&self, session: &PlayerSession) -> Result<(), IdentityError> {
        let io_err = |source| IdentityError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(session).map_err(|source| {
            IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, raw).map_err(io_err)
    }

    /// Called on logout.
    pub fn clear(&self) -> Result<(), IdentityError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IdentityError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_is_anonymous() {
        assert!(PlayerSession::signed_in("   ").is_anonymous());
        assert_eq!(PlayerSession::anonymous().identifier(), "");
        assert_eq!(PlayerSession::signed_in(" a@b.com ").identifier(), "a@b.com");
    }

    #[test]
    fn save_load_clear_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("nested").join("player.json"));

        assert!(store.load().unwrap().is_anonymous());

        store.save(&PlayerSession::signed_in("a@b.com")).unwrap();
        assert_eq!(store.load().unwrap().email(), Some("a@b.com"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_anonymous());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            IdentityStore::new(&path).load(),
            Err(IdentityError::Corrupt { .. })
        ));
    }
}
