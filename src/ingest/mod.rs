// src/ingest/mod.rs

use std::{
    collections::HashSet,
    fs,
    path::Path,
};

use tracing::{info, warn};

use crate::{config::Config, error::IngestError, sheets, warehouse::TableSink};

/// What a completed run did. Logged once at the end by the driver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub tables_loaded: usize,
    pub rows_uploaded: u64,
}

/// One `read_dir` pass, entry names in the order the OS hands them back.
/// No filtering and no recursion: a directory or a non-spreadsheet entry
/// fails later at the read step, not here.
pub fn list_files(dir: &Path) -> Result<Vec<String>, IngestError> {
    let entries = fs::read_dir(dir).map_err(|e| IngestError::Filesystem {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::Filesystem {
            path: dir.to_path_buf(),
            source: e,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Destination table name: everything before the first `.` of the file
/// name. No dot means the whole name; a leading dot means an empty name,
/// which goes to the warehouse as-is.
pub fn derive_table_name(file_name: &str) -> &str {
    file_name
        .split_once('.')
        .map_or(file_name, |(prefix, _)| prefix)
}

/// The one-shot batch driver: list, then for each file read the configured
/// sheet and replace its table, strictly one file at a time.
pub struct Runner<'a, S> {
    config: &'a Config,
    sink: &'a S,
}

impl<'a, S: TableSink> Runner<'a, S> {
    pub fn new(config: &'a Config, sink: &'a S) -> Self {
        Self { config, sink }
    }

    /// Process every file in listing order. The first error of any step
    /// aborts the run; tables already replaced stay replaced, files after
    /// the failing one are never attempted.
    pub async fn run(&self) -> Result<RunSummary, IngestError> {
        let files = list_files(&self.config.source_dir)?;
        info!(
            entries = files.len(),
            dir = %self.config.source_dir.display(),
            "listed source directory"
        );

        let mut summary = RunSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        for file_name in &files {
            let table_name = derive_table_name(file_name);
            let table_ref = format!("{}.{}", self.config.dataset_id, table_name);
            if !seen.insert(table_name.to_string()) {
                // Two files sharing a base name: last write wins.
                warn!(file = %file_name, table = %table_ref, "base name collision, table will be overwritten");
            }

            let path = self.config.source_dir.join(file_name);
            let records = sheets::read_sheet(&path, &self.config.sheet_name)?;
            self.sink
                .replace_table(&self.config.dataset_id, table_name, &records)
                .await
                .map_err(|e| IngestError::upload(table_ref.clone(), e))?;

            // Completion line only after a successful upload.
            info!(rows = records.num_rows(), "{} -> {}", path.display(), table_ref);
            summary.tables_loaded += 1;
            summary.rows_uploaded += records.num_rows() as u64;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::RecordSet;
    use anyhow::{bail, Result};
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Sink that records every call and optionally fails on the Nth one.
    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String, usize)>>,
        fail_on_call: Option<usize>,
    }

    impl TableSink for RecordingSink {
        async fn replace_table(
            &self,
            dataset_id: &str,
            table_id: &str,
            records: &RecordSet,
        ) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((
                dataset_id.to_string(),
                table_id.to_string(),
                records.num_rows(),
            ));
            if Some(calls.len()) == self.fail_on_call {
                bail!("injected upload failure");
            }
            Ok(())
        }
    }

    fn write_workbook(dir: &Path, file_name: &str, rows: &[&str]) -> Result<PathBuf> {
        let path = dir.join(file_name);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Data")?;
        sheet.write_string(0, 0, "value")?;
        for (i, row) in rows.iter().enumerate() {
            sheet.write_string(i as u32 + 1, 0, *row)?;
        }
        workbook.save(&path)?;
        Ok(path)
    }

    fn test_config(source_dir: &Path) -> Config {
        Config {
            credentials_file: PathBuf::from("unused.json"),
            project_id: "acme-analytics".into(),
            dataset_id: "sales".into(),
            source_dir: source_dir.to_path_buf(),
            sheet_name: "Data".into(),
        }
    }

    #[test]
    fn table_name_is_the_prefix_before_the_first_dot() {
        assert_eq!(derive_table_name("customers.xlsx"), "customers");
        assert_eq!(derive_table_name("report.v1.xlsx"), "report");
        assert_eq!(derive_table_name("nodots"), "nodots");
        assert_eq!(derive_table_name(".hidden"), "");
    }

    #[test]
    fn missing_directory_is_a_filesystem_error() {
        let err = list_files(Path::new("/no/such/directory")).unwrap_err();
        assert!(matches!(err, IngestError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn empty_directory_completes_with_zero_uploads() -> Result<()> {
        let dir = TempDir::new()?;
        let config = test_config(dir.path());
        let sink = RecordingSink::default();

        let summary = Runner::new(&config, &sink).run().await?;

        assert_eq!(summary, RunSummary::default());
        assert!(sink.calls.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn uploads_every_file_in_listing_order() -> Result<()> {
        let dir = TempDir::new()?;
        write_workbook(dir.path(), "customers.xlsx", &["alice", "bob"])?;
        write_workbook(dir.path(), "orders.xlsx", &["o-1"])?;

        let config = test_config(dir.path());
        let sink = RecordingSink::default();
        let summary = Runner::new(&config, &sink).run().await?;

        assert_eq!(summary.tables_loaded, 2);
        assert_eq!(summary.rows_uploaded, 3);

        let expected: Vec<String> = list_files(dir.path())?
            .iter()
            .map(|f| derive_table_name(f).to_string())
            .collect();
        let calls = sink.calls.lock().unwrap();
        let uploaded: Vec<String> = calls.iter().map(|(_, t, _)| t.clone()).collect();
        assert_eq!(uploaded, expected);
        assert!(calls.iter().all(|(d, _, _)| d == "sales"));
        Ok(())
    }

    #[tokio::test]
    async fn second_upload_failure_halts_after_one_success() -> Result<()> {
        let dir = TempDir::new()?;
        write_workbook(dir.path(), "customers.xlsx", &["alice"])?;
        write_workbook(dir.path(), "orders.xlsx", &["o-1"])?;
        write_workbook(dir.path(), "refunds.xlsx", &["r-1"])?;

        let config = test_config(dir.path());
        let sink = RecordingSink {
            fail_on_call: Some(2),
            ..Default::default()
        };

        let err = Runner::new(&config, &sink).run().await.unwrap_err();
        assert!(matches!(err, IngestError::Upload { .. }));

        // The failing call was attempted, the third file never was.
        assert_eq!(sink.calls.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_file_halts_the_run() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("broken.xlsx"), b"not a workbook")?;

        let config = test_config(dir.path());
        let sink = RecordingSink::default();

        let err = Runner::new(&config, &sink).run().await.unwrap_err();
        assert!(matches!(err, IngestError::SheetRead { .. }));
        assert!(sink.calls.lock().unwrap().is_empty());
        Ok(())
    }
}
