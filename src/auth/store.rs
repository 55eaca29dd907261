//! Cookie persistence between runs, keyed by site domain

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::browser::Cookie;
use crate::error::{BrowserError, Result};
use crate::utils::site_key;

/// Saved cookies for one site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub domain: String,
    pub saved_at: DateTime<Utc>,
    pub cookies: Vec<Cookie>,
}

impl StoredSession {
    pub fn new(url: &str, cookies: Vec<Cookie>) -> Self {
        Self {
            domain: site_key(url),
            saved_at: Utc::now(),
            cookies,
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.saved_at)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Cookies saved for the site behind `url`, if any
    async fn load_session(&self, url: &str) -> Result<Option<Vec<Cookie>>>;

    async fn save_session(&self, url: &str, cookies: Vec<Cookie>) -> Result<()>;
}

/// One JSON file per domain inside a directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        let name: String = site_key(url)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    async fn read(&self, url: &str) -> Result<Option<StoredSession>> {
        let path = self.path_for(url);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&raw).map_err(|e| {
            BrowserError::Config(format!("Corrupt session file {}: {}", path.display(), e))
        })?;
        Ok(Some(session))
    }

    /// How long ago the site's session was saved
    pub async fn session_age(&self, url: &str) -> Result<Option<chrono::Duration>> {
        Ok(self.read(url).await?.map(|session| session.age()))
    }

    /// Whether the saved session is missing or older than `max_age`
    pub async fn is_stale(&self, url: &str, max_age: Duration) -> Result<bool> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| BrowserError::Config(format!("Invalid session age: {}", e)))?;
        Ok(match self.session_age(url).await? {
            Some(age) => age > max_age,
            None => true,
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load_session(&self, url: &str) -> Result<Option<Vec<Cookie>>> {
        let session = self.read(url).await?;
        if let Some(session) = &session {
            log::debug!(
                "Loaded {} cookies for {} (saved {})",
                session.cookies.len(),
                session.domain,
                session.saved_at
            );
        }
        Ok(session.map(|s| s.cookies))
    }

    async fn save_session(&self, url: &str, cookies: Vec<Cookie>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let session = StoredSession::new(url, cookies);
        let path = self.path_for(url);
        tokio::fs::write(&path, serde_json::to_string_pretty(&session)?).await?;
        log::info!("Saved {} cookies for {}", session.cookies.len(), session.domain);
        Ok(())
    }
}

/// Sessions kept for the life of the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<StoredSession> {
        self.sessions.lock().ok()?.get(&site_key(url)).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_session(&self, url: &str) -> Result<Option<Vec<Cookie>>> {
        Ok(self.get(url).map(|s| s.cookies))
    }

    async fn save_session(&self, url: &str, cookies: Vec<Cookie>) -> Result<()> {
        let session = StoredSession::new(url, cookies);
        self.sessions
            .lock()
            .map_err(|e| BrowserError::Config(format!("Session store lock poisoned: {}", e)))?
            .insert(session.domain.clone(), session);
        Ok(())
    }
}
