//! Local storage adapters for the cart

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;
use crate::ports::LocalStore;
use crate::{Result, StorefrontError};

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore { dir: PathBuf }

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

impl LocalStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorefrontError::Storage(e.to_string())),
        }
    }

    /// Writes to a temporary file first so a crash never leaves half a cart.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let storage = |e: std::io::Error| StorefrontError::Storage(e.to_string());
        fs::create_dir_all(&self.dir).map_err(storage)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(storage)?;
        fs::rename(&tmp, &path).map_err(storage)?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }
}

/// Process-local store for hosts without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryStore { entries: Mutex<HashMap<String, Vec<u8>>> }

impl LocalStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|e| StorefrontError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| StorefrontError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;
    use crate::domain::aggregates::Cart;
    use crate::test_support::product;

    #[test]
    fn test_file_store_round_trip() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileStore::new(dir.path().join("state"));
        assert_eq!(store.load("cart")?, None);

        let mut cart = Cart::new();
        cart.add(&product("p1", 50000, 5), 2)?;
        cart.add(&product("p2", 20000, 9), 3)?;
        cart.add(&product("p3", 15000, 1), 1)?;
        store.save("cart", &cart.to_bytes()?)?;

        let restored = Cart::from_bytes(&store.load("cart")?.unwrap_or_default())?;
        assert_eq!(restored.items(), cart.items());
        assert!(!dir.path().join("state/cart.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_memory_store_overwrites() -> TestResult {
        let store = MemoryStore::default();
        store.save("cart", b"one")?;
        store.save("cart", b"two")?;
        assert_eq!(store.load("cart")?, Some(b"two".to_vec()));
        assert_eq!(store.load("other")?, None);
        Ok(())
    }
}
