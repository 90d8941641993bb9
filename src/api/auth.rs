//! Admin authentication
//!
//! The bearer token is supplied by an injected [`TokenProvider`] instead of
//! being read from shared storage at every call site. The default provider,
//! [`StoredToken`], reads the `admin_token` key from a persisted JSON storage
//! file and caches it for a short while.

use super::error::ApiError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Storage key holding the admin bearer token
pub const TOKEN_KEY: &str = "admin_token";

/// How long a token read from storage is trusted before re-reading the file
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of the bearer token for authenticated calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when the admin is signed out
    async fn token(&self) -> Option<String>;

    /// Drop any cached token (called after a 401)
    async fn invalidate(&self) {}
}

/// Fixed token, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self(Some(token.to_string()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Clone)]
struct CachedToken {
    token: Option<String>,
    read_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.read_at.elapsed() < TOKEN_CACHE_TTL
    }
}

/// Token persisted in a JSON key-value storage file
#[derive(Clone)]
pub struct StoredToken {
    path: PathBuf,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl StoredToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token, keeping any other keys already in the storage file
    pub async fn save(&self, token: &str) -> Result<()> {
        let mut storage = read_storage(&self.path).await.unwrap_or_default();
        storage.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        write_storage(&self.path, &storage).await?;

        *self.cache.write().await = Some(CachedToken {
            token: Some(token.to_string()),
            read_at: Instant::now(),
        });
        Ok(())
    }

    /// Remove the token from storage (sign out)
    pub async fn clear(&self) -> Result<()> {
        if let Some(mut storage) = read_storage(&self.path).await {
            storage.remove(TOKEN_KEY);
            write_storage(&self.path, &storage).await?;
        }
        self.invalidate().await;
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for StoredToken {
    async fn token(&self) -> Option<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return cached.token.clone();
                }
                tracing::debug!("Cached admin token expired, re-reading storage");
            }
        }

        let token = read_storage(&self.path)
            .await
            .and_then(|storage| storage.get(TOKEN_KEY).and_then(|v| v.as_str()).map(String::from));

        *self.cache.write().await = Some(CachedToken {
            token: token.clone(),
            read_at: Instant::now(),
        });

        token
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

async fn read_storage(path: &Path) -> Option<Map<String, Value>> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            tracing::warn!("Token storage {:?} is not a JSON object", path);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to parse token storage {:?}: {}", path, e);
            None
        }
    }
}

async fn write_storage(path: &Path, storage: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(storage)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write token storage {:?}", path))
}

/// Auth dependency handed to the API client at construction time
#[derive(Clone)]
pub struct AuthContext {
    provider: Arc<dyn TokenProvider>,
}

impl AuthContext {
    pub fn new(provider: impl TokenProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Bearer token for the next call; fails before any I/O when signed out
    pub async fn bearer(&self) -> Result<String, ApiError> {
        match self.provider.token().await {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ApiError::Authentication(
                "Not signed in. Sign in to the admin panel again.".to_string(),
            )),
        }
    }

    pub async fn invalidate(&self) {
        self.provider.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_bearer() {
        let auth = AuthContext::new(StaticToken::new("abc"));
        let token = tokio_test::block_on(auth.bearer());
        assert_eq!(token, Ok("abc".to_string()));
    }

    #[test]
    fn test_signed_out_is_authentication_error() {
        let auth = AuthContext::new(StaticToken::signed_out());
        let err = tokio_test::block_on(auth.bearer()).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_blank_token_is_rejected() {
        let auth = AuthContext::new(StaticToken::new("   "));
        assert!(tokio_test::block_on(auth.bearer()).is_err());
    }

    #[tokio::test]
    async fn test_stored_token_reads_admin_token_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"admin_token": "stored", "theme": "dark"}"#).unwrap();

        let stored = StoredToken::new(&path);
        assert_eq!(stored.token().await, Some("stored".to_string()));
    }

    #[tokio::test]
    async fn test_stored_token_save_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let stored = StoredToken::new(&path);
        stored.save("fresh").await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[TOKEN_KEY], "fresh");
        assert_eq!(stored.token().await, Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn test_clear_signs_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let stored = StoredToken::new(&path);
        stored.save("temp").await.unwrap();
        stored.clear().await.unwrap();

        assert_eq!(stored.token().await, None);
    }

    #[tokio::test]
    async fn test_missing_storage_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let stored = StoredToken::new(dir.path().join("absent.json"));
        let auth = AuthContext::new(stored);
        assert!(auth.bearer().await.unwrap_err().is_authentication());
    }
}
