//! Durable storage for the serialized auth state blob.
//!
//! Storage priority:
//! 1. Platform keyring (if the `keyring-storage` feature is enabled)
//! 2. File-based storage (one 0600 JSON file per key)
//!
//! The store is a plain key/value collaborator: callers hand it an opaque
//! string blob and get the same blob back, field-for-field. Writes are
//! atomic per key; there are no partial updates.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "keyring-storage")]
use keyring::Entry;

/// Service name used for keyring storage
#[cfg(feature = "keyring-storage")]
const KEYRING_SERVICE: &str = "tickertape-agent";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state i/o failure")]
    Io(#[from] std::io::Error),

    /// The stored blob could not be (de)serialized.
    #[error("corrupt state blob")]
    Corrupt(#[from] serde_json::Error),

    /// No usable config/data directory on this system.
    #[error("could not determine a storage directory")]
    NoStorageDir,

    #[cfg(feature = "keyring-storage")]
    #[error("keyring failure")]
    Keyring(#[from] keyring::Error),
}

/// Key/value persistence for auth state.
///
/// Implementations must round-trip blobs verbatim and keep each key's write
/// atomic. Reads and writes are synchronous.
pub trait StateStore: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if nothing was saved yet.
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the blob stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ============================================================================
// File-based storage (always available)
// ============================================================================

/// Stores each key as a JSON file under a directory, created on first save.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default storage directory: `~/.config/tickertape`
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|p| p.join("tickertape"))
            .ok_or(StoreError::NoStorageDir)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("state loaded from {:?}", path);
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.key_path(key);

        // Restrictive permissions before the blob hits disk; it holds tokens.
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(value.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, value)?;
        }

        tracing::debug!("state saved to {:?}", path);
        Ok(())
    }
}

// ============================================================================
// Keyring-based storage (optional, platform-specific)
// ============================================================================

/// Stores each key as a password entry in the platform keyring.
#[cfg(feature = "keyring-storage")]
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

#[cfg(feature = "keyring-storage")]
impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, key).map_err(Into::into)
    }
}

#[cfg(feature = "keyring-storage")]
impl StateStore for KeyringStore {
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                tracing::debug!("state loaded from keyring");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        tracing::debug!("state saved to keyring");
        Ok(())
    }
}

// ============================================================================
// Backend selection
// ============================================================================

/// Build the storage backend selected by the crate features.
pub fn default_store() -> Result<Arc<dyn StateStore>, StoreError> {
    #[cfg(feature = "keyring-storage")]
    {
        Ok(Arc::new(KeyringStore::new(KEYRING_SERVICE)))
    }

    #[cfg(not(feature = "keyring-storage"))]
    {
        Ok(Arc::new(FileStore::new(FileStore::default_dir()?)))
    }
}

/// Describe where state lands, for status/config output.
pub fn storage_description() -> String {
    #[cfg(all(feature = "keyring-storage", target_os = "windows"))]
    {
        "Windows Credential Manager".to_string()
    }
    #[cfg(all(feature = "keyring-storage", target_os = "macos"))]
    {
        "macOS Keychain".to_string()
    }
    #[cfg(all(feature = "keyring-storage", target_os = "linux"))]
    {
        "Linux Secret Service (GNOME Keyring/KWallet)".to_string()
    }
    #[cfg(not(feature = "keyring-storage"))]
    {
        let dir = FileStore::default_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "~/.config/tickertape".to_string());
        format!("File-based storage: {dir}")
    }
}
