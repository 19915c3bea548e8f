//! Credential storage.
//!
//! At most one credential exists per client, kept under a single well-known
//! key. The store never validates what it holds; `token::decode` does that
//! lazily when the session needs the expiry.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::StoreError;

/// Key (and file name) the credential is stored under.
pub const CREDENTIAL_KEY: &str = "token";

/// Holder of the session's single credential.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// The stored credential, or `None` when absent or empty.
    fn get(&self) -> Result<Option<String>, StoreError>;

    /// Store `credential`, overwriting any previous value.
    fn set(&self, credential: &str) -> Result<(), StoreError>;

    /// Remove the stored credential. Removing nothing is not an error.
    fn remove(&self) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    credential: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = self
            .credential
            .read()
            .map(|c| c.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some());
        f.debug_struct("MemoryStore").field("has_credential", &held).finish()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        let guard = self.credential.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone().filter(|c| !c.is_empty()))
    }

    fn set(&self, credential: &str) -> Result<(), StoreError> {
        let mut guard = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(credential.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        let mut guard = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

/// Store backed by a single file named [`CREDENTIAL_KEY`] inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIAL_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let credential = contents.trim();
                Ok((!credential.is_empty()).then(|| credential.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn set(&self, credential: &str) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, credential).map_err(write_err)
    }

    fn remove(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
