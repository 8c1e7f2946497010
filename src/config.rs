// src/config.rs

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Run configuration, fixed at startup and never re-read mid-run.
///
/// Loaded from a YAML file; there are no CLI flags and no environment
/// variables beyond `RUST_LOG` for log filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the service-account key JSON used to authenticate every upload.
    pub credentials_file: PathBuf,
    /// GCP project that owns the destination dataset.
    pub project_id: String,
    /// Destination dataset; each file lands at `<dataset_id>.<base name>`.
    pub dataset_id: String,
    /// Directory whose entries are ingested, one table per file.
    pub source_dir: PathBuf,
    /// Worksheet extracted from every file.
    pub sheet_name: String,
}

impl Config {
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_full_config() -> Result<()> {
        let yaml = r#"
credentials_file: /secrets/bq_service_account.json
project_id: acme-analytics
dataset_id: sales
source_dir: /data/exports
sheet_name: Data
"#;
        let mut file = NamedTempFile::new()?;
        file.write_all(yaml.as_bytes())?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.project_id, "acme-analytics");
        assert_eq!(config.dataset_id, "sales");
        assert_eq!(config.sheet_name, "Data");
        assert_eq!(config.source_dir, PathBuf::from("/data/exports"));
        Ok(())
    }

    #[test]
    fn missing_key_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"project_id: acme-analytics\n")?;
        assert!(Config::from_file(file.path()).is_err());
        Ok(())
    }
}
