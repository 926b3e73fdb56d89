//! Dataset validator

use std::io::Cursor;

use polars::prelude::*;

use super::DatasetSchema;
use crate::config::normalize_column_name;
use crate::error::{MemoryError, Result};

/// A dataset that passed validation.
///
/// Required columns are `Float64`; every other column keeps its original
/// position and string values.
#[derive(Debug, Clone)]
pub struct CleanDataset {
    pub frame: DataFrame,
    pub source_name: String,
}

impl CleanDataset {
    pub fn rows(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Read CSV bytes into a frame whose columns are all strings.
///
/// Nothing is type-inferred here so the validator sees the cells exactly as
/// they were uploaded.
pub fn parse_csv(bytes: &[u8]) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| MemoryError::Data(format!("Unreadable CSV: {}", e)))
}

/// Characters of `value` outside `[0-9.]`, distinct and in order of appearance
pub fn invalid_characters(value: &str) -> String {
    let mut invalid = String::new();
    for c in value.trim().chars() {
        if !(c.is_ascii_digit() || c == '.') && !invalid.contains(c) {
            invalid.push(c);
        }
    }
    invalid
}

fn string_values(frame: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = frame.column(column)?.as_materialized_series();
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Validate `frame` against `schema`.
///
/// Column names are trimmed and lowercased. Rows are scanned top to bottom
/// and the first required cell with a character outside `[0-9.]` fails the
/// whole dataset. Empty cells pass and become nulls.
pub fn validate(frame: DataFrame, source_name: &str, schema: &DatasetSchema) -> Result<CleanDataset> {
    let mut frame = frame;

    let normalized: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| normalize_column_name(name.as_str()))
        .collect();
    frame
        .set_column_names(normalized.iter().map(String::as_str))
        .map_err(|e| MemoryError::Data(format!("Invalid header in '{}': {}", source_name, e)))?;

    let required = schema.required_columns();
    if let Some(missing) = required.iter().find(|col| !normalized.iter().any(|n| n == *col)) {
        return Err(MemoryError::Schema {
            column: missing.to_string(),
            source_name: source_name.to_string(),
        });
    }

    let columns: Vec<(&str, Vec<Option<String>>)> = required
        .iter()
        .map(|col| Ok((*col, string_values(&frame, col)?)))
        .collect::<Result<_>>()?;

    for row in 0..frame.height() {
        for (column, values) in &columns {
            let Some(value) = values[row].as_deref() else {
                continue;
            };
            let invalid = invalid_characters(value);
            if !invalid.is_empty() {
                return Err(MemoryError::Format {
                    row: row + 1,
                    line: row + 2,
                    column: column.to_string(),
                    source_name: source_name.to_string(),
                    invalid,
                });
            }
        }
    }

    for (column, values) in columns {
        let numeric: Vec<Option<f64>> = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok()))
            .collect();
        frame.with_column(Series::new(column.into(), numeric))?;
    }

    tracing::debug!(source = %source_name, rows = frame.height(), "Dataset validated");

    Ok(CleanDataset {
        frame,
        source_name: source_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> DatasetSchema {
        DatasetSchema::default()
    }

    #[test]
    fn test_valid_dataset() {
        let df = df!(
            "sqft" => &["500", "3000"],
            "is_expensive" => &["0", "1"]
        )
        .unwrap();

        let clean = validate(df, "houses.csv", &schema()).unwrap();
        assert_eq!(clean.rows(), 2);
        let sqft: Vec<Option<f64>> = clean.frame.column("sqft").unwrap().as_materialized_series().f64().unwrap().into_iter().collect();
        assert_eq!(sqft, vec![Some(500.0), Some(3000.0)]);
    }

    #[test]
    fn test_invalid_character_reports_location() {
        let df = df!(
            "sqft" => &["5a0"],
            "is_expensive" => &["0"]
        )
        .unwrap();

        match validate(df, "bad.csv", &schema()) {
            Err(MemoryError::Format { row, line, column, source_name, invalid }) => {
                assert_eq!(row, 1);
                assert_eq!(line, 2);
                assert_eq!(column, "sqft");
                assert_eq!(source_name, "bad.csv");
                assert_eq!(invalid, "a");
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_first_bad_cell_wins() {
        let df = df!(
            "sqft" => &["500", "700", "9x9"],
            "is_expensive" => &["0", "yes", "1"]
        )
        .unwrap();

        let err = validate(df, "bad.csv", &schema()).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::Format { line: 3, ref column, ref invalid, .. } if column == "is_expensive" && invalid == "yes"
        ));
    }

    #[test]
    fn test_missing_column() {
        let df = df!("sqft" => &["500"]).unwrap();
        let err = validate(df, "partial.csv", &schema()).unwrap_err();
        assert!(matches!(err, MemoryError::Schema { ref column, .. } if column == "is_expensive"));
    }

    #[test]
    fn test_headers_are_normalized() {
        let df = df!(
            " SqFt " => &["1200"],
            "IS_EXPENSIVE" => &["0"],
            "Notes" => &["corner lot"]
        )
        .unwrap();

        let clean = validate(df, "mixed.csv", &schema()).unwrap();
        let names: Vec<String> = clean.frame.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["sqft", "is_expensive", "notes"]);
        // Extra columns are untouched
        assert_eq!(clean.frame.column("notes").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_extra_columns_not_checked() {
        let df = df!(
            "id" => &["a-1"],
            "sqft" => &["800"],
            "is_expensive" => &["0"]
        )
        .unwrap();
        assert!(validate(df, "ids.csv", &schema()).is_ok());
    }

    #[test]
    fn test_negative_numbers_rejected() {
        let df = df!("sqft" => &["-5"], "is_expensive" => &["0"]).unwrap();
        let err = validate(df, "neg.csv", &schema()).unwrap_err();
        assert!(matches!(err, MemoryError::Format { ref invalid, .. } if invalid == "-"));
    }

    #[test]
    fn test_parse_csv_keeps_strings() {
        let df = parse_csv(b"sqft,is_expensive\n500,0\n3000,1\n").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("sqft").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(invalid_characters("5a0b"), "ab");
        assert_eq!(invalid_characters(" 12.5 "), "");
        assert_eq!(invalid_characters("1,000,000"), ",");
    }
}
