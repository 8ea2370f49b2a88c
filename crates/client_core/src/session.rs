use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex as StdMutex,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::{AccessToken, ClientError};

/// What survives a restart: the two keys written after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub username: String,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, ClientError>;
    fn save(&self, session: &StoredSession) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Keeps the session as a small JSON object on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ClientError::Session(format!(
                    "failed to read '{}': {err}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) if !session.token.is_empty() => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(path = %self.path.display(), "discarding unreadable session file: {err}");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::Session(format!(
                    "failed to create session directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }
        let body = serde_json::to_string_pretty(session)
            .map_err(|err| ClientError::Session(err.to_string()))?;
        fs::write(&self.path, body).map_err(|err| {
            ClientError::Session(format!("failed to write '{}': {err}", self.path.display()))
        })
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::Session(format!(
                "failed to remove '{}': {err}",
                self.path.display()
            ))),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: StdMutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: StdMutex::new(Some(session)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        Ok(self.lock().clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.lock() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: AccessToken,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
}

/// Process-wide owner of the login session.
///
/// The store is read once in [`SessionManager::init`]; afterwards the
/// in-memory copy is authoritative and every change is written through and
/// broadcast to subscribers.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn init(store: Box<dyn SessionStore>) -> Result<Self, ClientError> {
        let current = store.load()?.map(|stored| Session {
            token: AccessToken::new(stored.token),
            username: stored.username,
        });
        if let Some(session) = &current {
            info!(username = %session.username, "restored saved session");
        }
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            store,
            current: RwLock::new(current),
            events,
        })
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn establish(
        &self,
        token: AccessToken,
        username: impl Into<String>,
    ) -> Result<Session, ClientError> {
        let session = Session {
            token,
            username: username.into(),
        };
        self.store.save(&StoredSession {
            token: session.token.as_str().to_string(),
            username: session.username.clone(),
        })?;
        *self.current.write().await = Some(session.clone());
        info!(username = %session.username, "session established");
        let _ = self.events.send(SessionEvent::LoggedIn {
            username: session.username.clone(),
        });
        Ok(session)
    }

    /// Forgets the session in memory even when the store cannot be cleared.
    pub async fn teardown(&self) -> Result<(), ClientError> {
        let previous = self.current.write().await.take();
        let cleared = self.store.clear();
        if previous.is_some() {
            info!("session cleared");
        }
        let _ = self.events.send(SessionEvent::LoggedOut);
        cleared
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
