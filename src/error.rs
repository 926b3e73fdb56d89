//! Error types for the collective-memory workflow

use std::fmt;

use thiserror::Error;

/// Result type alias for collective-memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Main error type for the workflow
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Missing required column '{column}' in '{source_name}'")]
    Schema { column: String, source_name: String },

    #[error("Invalid characters '{invalid}' in column '{column}' at line {line} of '{source_name}'")]
    Format {
        /// Data row, 1-indexed, header excluded
        row: usize,
        /// File line, header included (`row + 1`)
        line: usize,
        column: String,
        source_name: String,
        invalid: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model version not found: {model} v{version}")]
    NotFound { model: String, version: u64 },

    #[error("No production version registered for model '{0}'")]
    NoProductionVersion(String),

    #[error("System error: {0}")]
    System(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`MemoryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Schema,
    Format,
    InsufficientData,
    NotFound,
    NoProductionVersion,
    /// Rejected request that is not about a cell or column
    Data,
    System,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Format => "FormatError",
            ErrorKind::InsufficientData => "InsufficientDataError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::NoProductionVersion => "NoProductionVersionError",
            ErrorKind::Data => "DataError",
            ErrorKind::System => "SystemError",
        };
        f.write_str(name)
    }
}

impl MemoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::Schema { .. } => ErrorKind::Schema,
            MemoryError::Format { .. } => ErrorKind::Format,
            MemoryError::Data(_) => ErrorKind::Data,
            MemoryError::InsufficientData(_) => ErrorKind::InsufficientData,
            MemoryError::NotFound { .. } => ErrorKind::NotFound,
            MemoryError::NoProductionVersion(_) => ErrorKind::NoProductionVersion,
            MemoryError::System(_)
            | MemoryError::Serialization(_)
            | MemoryError::Io(_)
            | MemoryError::Config(_) => ErrorKind::System,
        }
    }

    /// Whether the error is caused by the submitted data rather than infrastructure
    pub fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::System)
    }

    /// Message safe to show to an end user.
    ///
    /// System failures are replaced by a generic message. Logging the detail is
    /// left to the caller.
    pub fn public_message(&self) -> String {
        if self.is_user_error() {
            self.to_string()
        } else {
            "Failed to store memory. Check server logs for details.".to_string()
        }
    }

    pub(crate) fn system(context: &str, err: impl fmt::Display) -> Self {
        MemoryError::System(format!("{}: {}", context, err))
    }
}

impl From<polars::error::PolarsError> for MemoryError {
    fn from(err: polars::error::PolarsError) -> Self {
        MemoryError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for MemoryError {
    fn from(err: bincode::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MemoryError {
    fn from(err: ndarray::ShapeError) -> Self {
        MemoryError::Data(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let err = MemoryError::Format {
            row: 1,
            line: 2,
            column: "sqft".to_string(),
            source_name: "houses.csv".to_string(),
            invalid: "a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid characters 'a' in column 'sqft' at line 2 of 'houses.csv'"
        );
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_system_errors_are_generic() {
        let err = MemoryError::System("bucket unreachable at 10.0.0.3".to_string());
        assert!(!err.is_user_error());
        assert!(!err.public_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MemoryError = io_err.into();
        assert!(matches!(err, MemoryError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::System);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NoProductionVersion.to_string(), "NoProductionVersionError");
        assert_eq!(ErrorKind::Schema.to_string(), "SchemaError");
        assert_eq!(ErrorKind::Data.to_string(), "DataError");
    }

    #[test]
    fn test_data_errors_are_not_format_errors() {
        let err = MemoryError::Data("No selected file".to_string());
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.is_user_error());
        assert_eq!(err.public_message(), "Data error: No selected file");
    }

    #[test]
    fn test_public_message_is_repeatable() {
        let err = MemoryError::Config("bad registry dir".to_string());
        assert_eq!(err.public_message(), err.public_message());
        assert_eq!(
            err.public_message(),
            "Failed to store memory. Check server logs for details."
        );
    }
}
