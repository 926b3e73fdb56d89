//! Listing of the datasets that make up the collective memory

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{object_name, ObjectStore};
use crate::error::Result;

/// One stored upload, as shown on a dashboard
#[derive(Debug, Clone, Serialize)]
pub struct MemoryEntry {
    /// File name without the uploads prefix
    pub name: String,
    /// Full object key
    pub full_path: String,
    /// Size in kilobytes, rounded to two decimals
    pub size_kb: f64,
    pub updated: DateTime<Utc>,
    pub kind: &'static str,
}

/// List every CSV under `prefix`, most recently updated first
pub fn list_memories(store: &dyn ObjectStore, prefix: &str) -> Result<Vec<MemoryEntry>> {
    let mut entries: Vec<MemoryEntry> = store
        .list(prefix)?
        .into_iter()
        .filter(|o| o.key.ends_with(".csv"))
        .map(|o| MemoryEntry {
            name: object_name(&o.key).to_string(),
            size_kb: (o.size as f64 / 1024.0 * 100.0).round() / 100.0,
            full_path: o.key,
            updated: o.updated,
            kind: "Structured CSV",
        })
        .collect();

    entries.sort_by(|a, b| b.updated.cmp(&a.updated));
    Ok(entries)
}
