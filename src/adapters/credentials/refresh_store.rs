//! Refresh token stores.
//!
//! - `InMemoryRefreshTokenStore` - process-local, for tests and short-lived runs
//! - `FileRefreshTokenStore` - a JSON map on disk, replaced atomically on save

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

use crate::ports::{RefreshTokenStore, RefreshTokenStoreError};

#[derive(Default, Clone)]
pub struct InMemoryRefreshTokenStore {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with one token.
    pub fn with_token(key: impl Into<String>, token: impl Into<String>) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(key.into(), token.into());
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn load(&self, key: &str) -> Result<Option<Secret<String>>, RefreshTokenStoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(key).cloned().map(Secret::new))
    }

    async fn save(&self, key: &str, token: &Secret<String>) -> Result<(), RefreshTokenStoreError> {
        let mut tokens = self.tokens.write().await;
        tokens.insert(key.to_string(), token.expose_secret().clone());
        Ok(())
    }
}

/// File-backed store. Writes go to a sibling temp file which is then
/// renamed over the target, so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FileRefreshTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRefreshTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, RefreshTokenStoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| RefreshTokenStoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RefreshTokenStore for FileRefreshTokenStore {
    async fn load(&self, key: &str) -> Result<Option<Secret<String>>, RefreshTokenStoreError> {
        let tokens = self.read_all().await?;
        Ok(tokens.get(key).cloned().map(Secret::new))
    }

    async fn save(&self, key: &str, token: &Secret<String>) -> Result<(), RefreshTokenStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut tokens = self.read_all().await?;
        tokens.insert(key.to_string(), token.expose_secret().clone());

        let json = serde_json::to_string_pretty(&tokens)
            .map_err(|e| RefreshTokenStoreError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), key, "Refresh token persisted");
        Ok(())
    }
}
