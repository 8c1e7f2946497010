// src/warehouse/mod.rs

use anyhow::{bail, Context, Result};
use google_cloud_bigquery::client::{
    google_cloud_auth::credentials::CredentialsFile, Client, ClientConfig,
};
use google_cloud_bigquery::http::job::query::QueryRequest;
use google_cloud_bigquery::http::tabledata::insert_all::{InsertAllRequest, Row as InsertRow};
use google_cloud_bigquery::query::row::Row;
use tracing::debug;

use crate::sheets::RecordSet;

/// The seam between the runner and the warehouse. The real implementation
/// talks to BigQuery; tests substitute a recording sink.
pub trait TableSink {
    /// Create-or-replace `dataset_id.table_id` with the record set's
    /// contents. Replace means replace: schema and rows both become
    /// whatever this record set defines.
    fn replace_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        records: &RecordSet,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// BigQuery client wrapper. Authenticated once from a service-account key
/// file at startup; reused, immutably, for every upload in the run.
pub struct BigQueryLoader {
    client: Client,
    project_id: String,
}

impl BigQueryLoader {
    pub async fn connect(credentials_file: &str, project_id: &str) -> Result<Self> {
        let credentials = CredentialsFile::new_from_file(credentials_file.to_string())
            .await
            .with_context(|| format!("reading service-account key {credentials_file}"))?;
        let (config, _) = ClientConfig::new_with_credentials(credentials)
            .await
            .context("authenticating BigQuery client")?;
        let client = Client::new(config)
            .await
            .context("building BigQuery client")?;
        Ok(Self {
            client,
            project_id: project_id.to_string(),
        })
    }
}

impl TableSink for BigQueryLoader {
    async fn replace_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        records: &RecordSet,
    ) -> Result<()> {
        // 1) CREATE OR REPLACE with an all-STRING schema. This drops any
        //    previous table of the same name, whatever its schema was.
        let ddl = build_replace_ddl(&self.project_id, dataset_id, table_id, &records.columns);
        debug!(table = %table_id, columns = records.columns.len(), "running replace DDL");
        let req = QueryRequest {
            query: ddl,
            use_legacy_sql: false,
            ..Default::default()
        };
        let mut rows = self
            .client
            .query::<Row>(&self.project_id, req)
            .await
            .with_context(|| format!("create-or-replace of {dataset_id}.{table_id}"))?;
        while rows.next().await?.is_some() { /* drain */ }

        // 2) Insert the rows, if the sheet had any.
        if records.rows.is_empty() {
            return Ok(());
        }
        let insert = InsertAllRequest {
            rows: records
                .json_rows()
                .into_iter()
                .map(|json| InsertRow {
                    insert_id: None,
                    json,
                })
                .collect(),
            ..Default::default()
        };
        let response = self
            .client
            .tabledata()
            .insert(&self.project_id, dataset_id, table_id, &insert)
            .await
            .with_context(|| format!("inserting rows into {dataset_id}.{table_id}"))?;

        if let Some(errors) = response.insert_errors {
            if !errors.is_empty() {
                bail!(
                    "{} row(s) rejected inserting into {}.{}: {:?}",
                    errors.len(),
                    dataset_id,
                    table_id,
                    errors
                );
            }
        }
        Ok(())
    }
}

/// All columns are STRING by design: every cell was already coerced to text
/// at read time. Column names pass through unvalidated; BigQuery rejects
/// ones it does not accept.
fn build_replace_ddl(
    project_id: &str,
    dataset_id: &str,
    table_id: &str,
    columns: &[String],
) -> String {
    let fields = columns
        .iter()
        .map(|name| format!("`{name}` STRING"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE OR REPLACE TABLE `{project_id}.{dataset_id}.{table_id}` ({fields})"
    )
}
