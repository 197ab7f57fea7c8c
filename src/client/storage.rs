//! Durable storage for client-side session state.
//!
//! Values live in named slots. A missing slot reads as `None`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Named-slot key/value storage that outlives the process (or pretends to).
pub trait TokenStorage: Send + Sync {
    fn get(&self, slot: &str) -> io::Result<Option<String>>;
    fn set(&self, slot: &str, value: &str) -> io::Result<()>;
    fn remove(&self, slot: &str) -> io::Result<()>;
}

/// One file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> io::Result<PathBuf> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid slot name: {slot:?}"),
            ));
        }
        Ok(self.dir.join(slot))
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, slot: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.slot_path(slot)?) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, slot: &str, value: &str) -> io::Result<()> {
        let path = self.slot_path(slot)?;
        std::fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves a half-written slot.
        let tmp = self
            .dir
            .join(format!(".{slot}.{}.tmp", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, path)
    }

    fn remove(&self, slot: &str) -> io::Result<()> {
        match std::fs::remove_file(self.slot_path(slot)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process storage for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, slot: &str) -> io::Result<Option<String>> {
        Ok(self.lock().get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> io::Result<()> {
        self.lock().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> io::Result<()> {
        self.lock().remove(slot);
        Ok(())
    }
}
