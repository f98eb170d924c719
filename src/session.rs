//! Session context shared by everything that talks to the API
//!
//! The session is an explicit value handed to the API client instead of
//! ambient storage. A 401 anywhere invalidates it for every holder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::api::SchoolApi;
use crate::models::User;

/// Outcome of resolving who is logged in
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Authenticated(User),
    Unauthenticated,
    Error(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Token file on disk so separate CLI invocations share one login
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read session file {}", self.path.display()))?;
        let data = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session file {}", self.path.display()))?;
        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Cannot write session file {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Cannot remove session file {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionData>>,
    store: Option<SessionStore>,
}

impl Session {
    /// Session that lives only in memory
    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionData { token, user: None })),
            store: None,
        }
    }

    /// Session backed by a token file. A corrupt file is discarded with a warning.
    pub fn load(store: SessionStore) -> Self {
        let data = match store.load() {
            Ok(data) => data.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable session: {:#}", e);
                SessionData::default()
            }
        };
        debug!(
            "Loaded session from {} (token present: {})",
            store.path().display(),
            data.token.is_some()
        );
        Self {
            inner: Arc::new(RwLock::new(data)),
            store: Some(store),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    /// Record a successful login and persist it
    pub fn establish(&self, token: String, user: User) -> Result<()> {
        info!("Logged in as {}", user.username);
        let snapshot = {
            let mut data = self.write();
            data.token = Some(token);
            data.user = Some(user);
            data.clone()
        };
        if let Some(store) = &self.store {
            store.save(&snapshot)?;
        }
        Ok(())
    }

    pub fn set_user(&self, user: User) {
        let snapshot = {
            let mut data = self.write();
            data.user = Some(user);
            data.clone()
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&snapshot) {
                warn!("Failed to persist session: {:#}", e);
            }
        }
    }

    /// Drop the token everywhere; called on logout and on any 401
    pub fn invalidate(&self) {
        {
            let mut data = self.write();
            if data.token.is_none() && data.user.is_none() {
                return;
            }
            *data = SessionData::default();
        }
        info!("Session invalidated");
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("Failed to remove session file: {:#}", e);
            }
        }
    }

    /// Resolve the current user against the backend
    pub async fn resolve(&self, api: &dyn SchoolApi) -> AuthState {
        if !self.is_authenticated() {
            return AuthState::Unauthenticated;
        }
        match api.current_user().await {
            Ok(user) => {
                self.set_user(user.clone());
                AuthState::Authenticated(user)
            }
            Err(e) if e.is_unauthorized() => {
                self.invalidate();
                AuthState::Unauthenticated
            }
            Err(e) => AuthState::Error(e.user_message()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
