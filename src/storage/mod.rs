//! Object Storage Module
//!
//! The workflow reads and writes datasets through the [`ObjectStore`] trait.
//! A cloud bucket client plugs in here; the crate ships a directory-backed
//! store and an in-memory store.

mod catalog;
mod local;
mod memory;

pub use catalog::{list_memories, MemoryEntry};
pub use local::LocalStore;
pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};

use crate::error::{MemoryError, Result};

/// Metadata of one stored object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Full object key, e.g. `uploads/houses.csv`
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub updated: DateTime<Utc>,
}

/// Storage backend trait
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Read an object's bytes
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or replace an object
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Check whether an object exists
    fn exists(&self, key: &str) -> Result<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Reject keys that are empty or could escape the store root
pub(crate) fn check_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(MemoryError::Data(format!("Invalid object key: '{}'", key)));
    }
    Ok(())
}

/// Final path component of a key (`uploads/a.csv` -> `a.csv`)
pub fn object_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("uploads/a.csv").is_ok());
        assert!(check_key("a.csv").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/etc/passwd").is_err());
        assert!(check_key("uploads/../secret").is_err());
        assert!(check_key("uploads//a.csv").is_err());
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("uploads/a.csv"), "a.csv");
        assert_eq!(object_name("a.csv"), "a.csv");
    }
}
