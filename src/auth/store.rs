//! Expiring cookie-like key/value storage backing the auth session.
//!
//! Entries carry an absolute expiry. Reading an expired entry returns
//! nothing and purges it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session storage is corrupt: {0}")]
    Corrupt(String),
    #[error("Internal lock error")]
    LockPoisoned,
}

/// One stored value with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Where the session cookies live.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<StoredCookie>, StoreError>;
    fn set(&self, name: &str, cookie: StoredCookie) -> Result<(), StoreError>;
    fn remove(&self, name: &str) -> Result<(), StoreError>;
}

// ═══════════════════════════════════════════════════════════
// In-memory
// ═══════════════════════════════════════════════════════════

/// Process-lifetime storage.
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<HashMap<String, StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Result<Option<StoredCookie>, StoreError> {
        let cookies = self.cookies.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(cookies.get(name).cloned())
    }

    fn set(&self, name: &str, cookie: StoredCookie) -> Result<(), StoreError> {
        let mut cookies = self.cookies.lock().map_err(|_| StoreError::LockPoisoned)?;
        cookies.insert(name.to_string(), cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        let mut cookies = self.cookies.lock().map_err(|_| StoreError::LockPoisoned)?;
        cookies.remove(name);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// JSON file
// ═══════════════════════════════════════════════════════════

/// Storage persisted as one JSON object on disk, so a session survives
/// restarts until it expires.
///
/// Writes go to a sibling temp file and are renamed into place.
pub struct FileCookieStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, StoredCookie>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, cookies: &HashMap<String, StoredCookie>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_vec_pretty(cookies).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut HashMap<String, StoredCookie>),
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        // A corrupt file is replaced rather than blocking sign-in forever.
        let mut cookies = match self.read_all() {
            Ok(cookies) => cookies,
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(path = %self.path.display(), %reason, "Discarding corrupt session file");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        mutate(&mut cookies);
        self.write_all(&cookies)
    }
}

impl CookieStore for FileCookieStore {
    fn get(&self, name: &str) -> Result<Option<StoredCookie>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(self.read_all()?.remove(name))
    }

    fn set(&self, name: &str, cookie: StoredCookie) -> Result<(), StoreError> {
        self.update(|cookies| {
            cookies.insert(name.to_string(), cookie);
        })
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.update(|cookies| {
            cookies.remove(name);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn cookie(value: &str, ttl: TimeDelta) -> StoredCookie {
        StoredCookie {
            value: value.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryCookieStore::new();
        store.set("a", cookie("1", TimeDelta::hours(1))).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap().value, "1");
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let expired = StoredCookie {
            value: "x".into(),
            expires_at: now - TimeDelta::seconds(1),
        };
        assert!(expired.is_expired(now));
        assert!(!cookie("x", TimeDelta::hours(1)).is_expired(now));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("session.json");

        let store = FileCookieStore::new(&path);
        store.set("access_token", cookie("tok", TimeDelta::days(1))).unwrap();

        let reopened = FileCookieStore::new(&path);
        assert_eq!(reopened.get("access_token").unwrap().unwrap().value, "tok");

        reopened.remove("access_token").unwrap();
        assert!(store.get("access_token").unwrap().is_none());
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCookieStore::new(tmp.path().join("absent.json"));
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_reports_then_recovers_on_write() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileCookieStore::new(&path);
        assert!(matches!(store.get("a"), Err(StoreError::Corrupt(_))));

        store.set("a", cookie("1", TimeDelta::hours(1))).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap().value, "1");
    }
}
