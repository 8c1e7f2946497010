// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a run. The first of these to occur aborts the
/// whole batch; tables already replaced stay replaced.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source directory is missing or unreadable.
    #[error("cannot list source directory {path:?}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be opened or parsed as a spreadsheet, or the
    /// sheet had no header row to derive columns from.
    #[error("cannot read spreadsheet {path:?}: {message}")]
    SheetRead {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<calamine::Error>,
    },

    /// The workbook opened fine but does not contain the configured sheet.
    #[error("sheet {sheet:?} not found in {path:?} (workbook has {available:?})")]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    /// The warehouse rejected the load: auth, network, DDL, quota or a
    /// row-level insert error.
    #[error("upload to {table} failed")]
    Upload {
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl IngestError {
    pub fn sheet_read(path: impl Into<PathBuf>, source: calamine::Error) -> Self {
        IngestError::SheetRead {
            path: path.into(),
            message: "not a readable workbook".into(),
            source: Some(source),
        }
    }

    pub fn sheet_empty(path: impl Into<PathBuf>) -> Self {
        IngestError::SheetRead {
            path: path.into(),
            message: "sheet has no header row".into(),
            source: None,
        }
    }

    pub fn upload(table: impl Into<String>, source: anyhow::Error) -> Self {
        IngestError::Upload {
            table: table.into(),
            source: source.into(),
        }
    }
}
