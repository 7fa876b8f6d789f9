use crate::cli::Args;
use log::{ debug, info };
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{ Arc, Mutex };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Snapshot storage lock poisoned")]
    Poisoned,
    #[error("Unsupported storage type: {0}")]
    UnsupportedType(String),
}

/// Durable key/value backend holding whole-state JSON snapshots.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError>;

    fn save(&self, key: &str, snapshot: &str) -> Result<(), SnapshotError>;
}

/// One `<key>.json` file per key under a base directory.
pub struct FileSnapshotStore {
    base_dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.snapshot_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, snapshot: &str) -> Result<(), SnapshotError> {
        let path = self.snapshot_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.as_bytes())?;
        fs::rename(&tmp, &path)?;
        debug!("Saved snapshot '{}' ({} bytes)", key, snapshot.len());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let entries = self.entries.lock().map_err(|_| SnapshotError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, snapshot: &str) -> Result<(), SnapshotError> {
        let mut entries = self.entries.lock().map_err(|_| SnapshotError::Poisoned)?;
        entries.insert(key.to_string(), snapshot.to_string());
        Ok(())
    }
}

pub fn create_snapshot_store(args: &Args) -> Result<Arc<dyn SnapshotStore>, SnapshotError> {
    match args.storage_type.to_lowercase().as_str() {
        "file" => {
            info!("Chat state will be stored in: {}", args.storage_dir);
            Ok(Arc::new(FileSnapshotStore::new(&args.storage_dir)?))
        }
        "memory" => {
            info!("Chat state will be kept in memory only");
            Ok(Arc::new(MemorySnapshotStore::new()))
        }
        _ => Err(SnapshotError::UnsupportedType(args.storage_type.clone())),
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_key_replaces_path_characters() {
        assert_eq!(sanitize_key("chat-storage"), "chat-storage");
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn file_store_returns_none_for_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();
        assert!(store.load("chat-storage").unwrap().is_none());
    }

    #[test]
    fn file_store_overwrites_whole_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        store.save("chat-storage", "{\"chats\":[1]}").unwrap();
        store.save("chat-storage", "{\"chats\":[]}").unwrap();

        assert_eq!(store.load("chat-storage").unwrap().as_deref(), Some("{\"chats\":[]}"));
        assert!(dir.path().join("chat-storage.json").exists());
        assert!(!dir.path().join("chat-storage.json.tmp").exists());
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileSnapshotStore::new(&nested).unwrap();
        store.save("auth-storage", "{}").unwrap();
        assert!(nested.join("auth-storage.json").exists());
    }

    #[test]
    fn memory_store_keeps_keys_separate() {
        let store = MemorySnapshotStore::new();
        store.save("chat-storage", "a").unwrap();
        store.save("auth-storage", "b").unwrap();
        assert_eq!(store.load("chat-storage").unwrap().as_deref(), Some("a"));
        assert_eq!(store.load("auth-storage").unwrap().as_deref(), Some("b"));
        assert!(store.load("other").unwrap().is_none());
    }
}
