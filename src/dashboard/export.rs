//! Dataset CSV export

use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::model::Dataset;

/// File name offered when the user does not pick one
pub const DEFAULT_FILE_NAME: &str = "heart-ia-dataset.csv";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the dataset as CSV and return the number of data rows
///
/// Columns follow [`Dataset::columns`]. Missing and null cells are empty.
pub fn export_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<usize, ExportError> {
    let columns = dataset.columns();
    let mut wtr = csv::Writer::from_writer(writer);

    if columns.is_empty() {
        wtr.flush()?;
        return Ok(0);
    }

    wtr.write_record(&columns)?;
    for record in &dataset.data {
        let row: Vec<String> = columns
            .iter()
            .map(|col| record.get(col).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    Ok(dataset.data.len())
}

pub fn export_csv_to_path(dataset: &Dataset, path: &Path) -> Result<usize, ExportError> {
    let file = File::create(path)?;
    let rows = export_csv(dataset, file)?;
    tracing::info!(rows, path = %path.display(), "Exported dataset");
    Ok(rows)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> Dataset {
        serde_json::from_value(json!({
            "data": [
                {"id": 1, "age": 50, "ap_hi": 120, "cardio": 0, "note": "a, b"},
                {"id": 2, "age": 61, "cardio": 1, "note": null}
            ],
            "total_records": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_export_csv() {
        let mut out = Vec::new();
        let rows = export_csv(&dataset(), &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,age,ap_hi,cardio,note");
        assert_eq!(lines[1], "1,50,120,0,\"a, b\"");
        assert_eq!(lines[2], "2,61,,1,");
    }

    #[test]
    fn test_export_empty_dataset() {
        let mut out = Vec::new();
        assert_eq!(export_csv(&Dataset::default(), &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);

        assert_eq!(export_csv_to_path(&dataset(), &path).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,age"));
    }
}
