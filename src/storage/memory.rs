//! In-memory object store

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{check_key, ObjectInfo, ObjectStore};
use crate::error::{MemoryError, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    updated: DateTime<Utc>,
}

/// Thread-safe object store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with an explicit modification time
    pub fn insert_at(&self, key: &str, bytes: &[u8], updated: DateTime<Utc>) -> Result<()> {
        check_key(key)?;
        self.objects.write().insert(
            key.to_string(),
            StoredObject { bytes: bytes.to_vec(), updated },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl ObjectStore for InMemoryStore {
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.read();
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.bytes.len() as u64,
                updated: obj.updated,
            })
            .collect())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| MemoryError::System(format!("Object not found: {}", key)))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.insert_at(key, bytes, Utc::now())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());

        store.write("uploads/a.csv", b"a").unwrap();
        store.write("uploads/b.csv", b"bb").unwrap();
        store.write("other/c.csv", b"c").unwrap();

        let listed = store.list("uploads/").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].size, 2);

        store.delete("uploads/a.csv").unwrap();
        assert!(!store.exists("uploads/a.csv").unwrap());
        assert!(store.read("uploads/a.csv").is_err());
        assert_eq!(store.len(), 2);
    }
}
