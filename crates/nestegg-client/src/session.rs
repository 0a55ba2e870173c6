//! Session state and the persistent token store behind it.
//!
//! # Design
//! - The persisted store is the source of truth; [`Session`] is a cached view refreshed from it.
//! - Blank tokens are treated as absent so a half-written session never counts as signed in.
//! - Storage failures surface as infrastructure errors, never as user notifications.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "access_token";

/// Persistent key-value store holding the bearer token.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> ClientResult<Option<String>>;

    /// Persist a token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, token: &str) -> ClientResult<()>;

    /// Remove the persisted token. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be modified.
    fn clear(&self) -> ClientResult<()>;
}

/// In-memory view of the persisted session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token, when signed in.
    pub token: Option<String>,
}

impl Session {
    /// Build a session from a raw stored value, discarding blank tokens.
    #[must_use]
    pub fn from_stored(token: Option<String>) -> Self {
        Self {
            token: token.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Whether a usable token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Borrow the token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Token store backed by a small JSON document on disk.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the session at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, operation: &'static str, source: io::Error) -> ClientError {
        ClientError::Storage {
            operation,
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.storage_error("read", err)),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let stored: StoredSession =
            serde_json::from_str(&raw).map_err(|source| ClientError::StorageFormat {
                path: self.path.clone(),
                source,
            })?;
        Ok(stored.access_token)
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.storage_error("create_dir", err))?;
        }
        let document = StoredSession {
            access_token: Some(token.to_string()),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|source| {
            ClientError::StorageFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|err| self.storage_error("write", err))?;
        restrict_permissions(&self.path).map_err(|err| self.storage_error("chmod", err))
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.storage_error("remove", err)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Token store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn session_discards_blank_tokens() {
        assert!(!Session::from_stored(None).is_authenticated());
        assert!(!Session::from_stored(Some("   ".into())).is_authenticated());
        let session = Session::from_stored(Some("T".into()));
        assert_eq!(session.token(), Some("T"));
    }

    #[test]
    fn file_store_round_trip_and_clear() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileTokenStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load()?, None);
        store.save("T")?;
        assert_eq!(store.load()?, Some("T".to_string()));

        let raw = fs::read_to_string(store.path())?;
        assert!(raw.contains(TOKEN_KEY));

        store.clear()?;
        assert_eq!(store.load()?, None);
        store.clear()?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn file_store_restricts_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir()?;
        let store = FileTokenStore::new(dir.path().join("session.json"));
        store.save("secret")?;
        let mode = fs::metadata(store.path())?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn file_store_reports_corrupt_documents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "not json")?;
        let store = FileTokenStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(ClientError::StorageFormat { .. })
        ));

        fs::write(&path, "\n")?;
        assert_eq!(store.load()?, None);
        Ok(())
    }

    #[test]
    fn memory_store_behaves_like_a_slot() -> Result<()> {
        let store = MemoryTokenStore::with_token("A");
        assert_eq!(store.load()?, Some("A".into()));
        store.save("B")?;
        assert_eq!(store.load()?, Some("B".into()));
        store.clear()?;
        assert_eq!(store.load()?, None);
        Ok(())
    }
}
