//! The single persisted key-value slot holding the credential record.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// One durable string slot.
pub trait CredentialSlot: Send + Sync {
    /// Current slot content, if any. Read failures count as empty.
    fn load(&self) -> Option<String>;
    fn save(&self, value: &str) -> io::Result<()>;
}

/// Slot stored as a file, created with its parent directories on first save.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSlot for FileSlot {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", self.path.display());
                None
            }
        }
    }

    fn save(&self, value: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // The slot is replaced atomically, never half-written.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &self.path)
    }
}

/// In-memory slot, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

impl CredentialSlot for MemorySlot {
    fn load(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, value: &str) -> io::Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }
}

impl<S: CredentialSlot + ?Sized> CredentialSlot for std::sync::Arc<S> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn save(&self, value: &str) -> io::Result<()> {
        (**self).save(value)
    }
}
