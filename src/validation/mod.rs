//! Dataset Validation Module
//!
//! Schema and cell-level numeric checks applied to every dataset before it
//! can join the collective memory.

mod schema;
mod validator;

pub use schema::DatasetSchema;
pub use validator::{invalid_characters, parse_csv, validate, CleanDataset};
