// # File Session Store
//
// File-based implementation of SessionStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `.tmp`, then rename over the real file
// - Backup: the previous file is copied to `.backup` before each rename
// - Recovery: a corrupt main file falls back to the backup, then to empty
// - Removal: removing an entry also deletes `.backup`, so a removed
//   session can never be recovered from it
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "bankUser": "{\"email\":\"admin@bank.com\",\"role\":\"admin\"}"
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::SessionStore;

/// Session file format version
const SESSION_FILE_VERSION: &str = "1.0";

/// File-based session store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use ledgersync_core::state::FileSessionStore;
/// use ledgersync_core::traits::SessionStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSessionStore::new("/var/lib/ledgersync/session.json").await?;
///     store.set("bankUser", r#"{"email":"a@b.com","role":"admin"}"#).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SessionFileFormat {
    version: String,
    entries: HashMap<String, String>,
}

impl FileSessionStore {
    /// Create or load a file session store
    ///
    /// Parent directories are created when missing. A corrupt file is
    /// recovered from its backup, or replaced by an empty store.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create session directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, String>, Error> {
        match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded session file: {} key(s)", entries.len());
                Ok(entries)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Session file {} is corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No session backup found. Starting with empty store.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(entries) => {
                        tracing::info!("Recovered session file from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore session file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(entries)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Session backup also unreadable: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, String>, Error> {
        if !path.exists() {
            tracing::debug!("Session file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::session_store(format!(
                "Failed to read session file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: SessionFileFormat = serde_json::from_str(&content)?;

        if file.version != SESSION_FILE_VERSION {
            tracing::warn!(
                "Session file version mismatch: expected {}, got {}. Attempting to load anyway.",
                SESSION_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    /// Write `entries` atomically
    ///
    /// With `keep_previous` the old file becomes the backup; without it the
    /// backup is deleted once the new file is in place.
    async fn write(
        &self,
        entries: &HashMap<String, String>,
        keep_previous: bool,
    ) -> Result<(), Error> {
        let file = SessionFileFormat {
            version: SESSION_FILE_VERSION.to_string(),
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::session_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await?;
            out.flush().await?;
        }

        let backup_path = Self::backup_path(&self.path);
        if keep_previous
            && self.path.exists()
            && let Err(e) = fs::copy(&self.path, &backup_path).await
        {
            tracing::warn!("Failed to create session backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::session_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        if !keep_previous && backup_path.exists() {
            fs::remove_file(&backup_path).await.map_err(|e| {
                Error::session_store(format!(
                    "Failed to delete session backup {}: {}",
                    backup_path.display(),
                    e
                ))
            })?;
        }

        tracing::trace!("Session file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries, true).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write(&entries, false).await
    }
}
