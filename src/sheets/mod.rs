// src/sheets/mod.rs

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::IngestError;

/// One sheet's worth of data, every cell already coerced to text.
///
/// `columns` is the first row of the sheet. `rows` hold `None` for empty
/// cells, which upload as NULL; every present value is a string no matter
/// what the spreadsheet cell type was. Downstream tables are all-STRING.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RecordSet {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Rows as JSON objects keyed by column name, the shape the warehouse
    /// insert API takes.
    pub fn json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, cell)| {
                        let value = match cell {
                            Some(text) => Value::String(text.clone()),
                            None => Value::Null,
                        };
                        (col.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Open `path` as a workbook, locate `sheet_name`, and return its contents
/// with every cell forced to text. The first row becomes the column names.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn read_sheet(path: &Path, sheet_name: &str) -> Result<RecordSet, IngestError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::sheet_read(path, e))?;

    let available = workbook.sheet_names();
    if !available.iter().any(|n| n == sheet_name) {
        return Err(IngestError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet_name.to_string(),
            available,
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| IngestError::sheet_read(path, e))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| IngestError::sheet_empty(path))?;

    // Header cells go through the same coercion; an empty header cell
    // becomes an empty column name and the warehouse decides its fate.
    let columns: Vec<String> = header
        .iter()
        .map(|cell| cell_to_text(cell).unwrap_or_default())
        .collect();

    let data: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(cell_to_text).collect())
        .collect();

    trace!(columns = columns.len(), rows = data.len(), "sheet loaded");

    Ok(RecordSet {
        columns,
        rows: data,
    })
}

/// Text coercion for a single cell. Empty cells are `None` (they upload as
/// NULL); everything else becomes its text rendering: `42` -> "42",
/// booleans -> "true"/"false", date cells -> "YYYY-MM-DD HH:MM:SS",
/// formula errors -> their display form ("#DIV/0!").
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Some((*f as i64).to_string())
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => {
            let text = match dt.as_datetime() {
                Some(naive) => format_datetime(naive),
                // Unrepresentable serial value; keep the raw number as text.
                None => dt.as_f64().to_string(),
            };
            Some(text)
        }
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(e.to_string()),
    }
}

/// Date cells render at seconds precision, the way they read in the sheet.
fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
