use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Identity of the signed-in user, handed to the controller at construction and
/// attached to every request so the service can aggregate per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    pub fn from_store(store: &SessionStore) -> Result<Self> {
        store
            .current()
            .map(Self::new)
            .ok_or_else(|| anyhow!("no signed-in session; sign in before starting detection"))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    session_id: Option<String>,
}

/// Local persisted state holding the `sessionId` key.
///
/// Written by the identity collaborator at sign-in and cleared at sign-out.
pub struct SessionStore {
    path: PathBuf,
    data: RwLock<PersistedSession>,
}

impl SessionStore {
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed session at {}: {}",
                    path.display(),
                    err
                );
                PersistedSession::default()
            })
        } else {
            PersistedSession::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .session_id
            .clone()
    }

    pub fn sign_in(&self, session_id: impl Into<String>) -> Result<()> {
        let session_id = session_id.into();
        if session_id.trim().is_empty() {
            return Err(anyhow!("session id must not be empty"));
        }
        self.replace(PersistedSession {
            session_id: Some(session_id),
        })
    }

    pub fn sign_out(&self) -> Result<()> {
        self.replace(PersistedSession::default())
    }

    fn replace(&self, next: PersistedSession) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let serialized = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;
        *guard = next;
        Ok(())
    }
}
