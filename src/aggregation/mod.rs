//! Memory Aggregation Module
//!
//! Merges a newly accepted dataset with every dataset already stored under the
//! uploads prefix. The result is recomputed from storage on every run.

mod aggregator;

pub use aggregator::{MemoryAggregator, MemorySet, SkippedDataset};
