use anyhow::Result;
use rustls::crypto::aws_lc_rs::default_provider;
use sheetloader::{ingest::Runner, warehouse::BigQueryLoader, Config};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    let _ = default_provider().install_default();

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sheetloader.yaml".to_string());
    let config = Config::from_file(&config_path)?;
    info!(
        dataset = %config.dataset_id,
        source = %config.source_dir.display(),
        sheet = %config.sheet_name,
        "configured"
    );

    // ─── 3) authenticate once, reuse for every upload ────────────────
    let loader = BigQueryLoader::connect(
        &config.credentials_file.to_string_lossy(),
        &config.project_id,
    )
    .await?;

    // ─── 4) run the batch; first failure aborts with non-zero exit ───
    let summary = Runner::new(&config, &loader).run().await?;
    info!(
        tables = summary.tables_loaded,
        rows = summary.rows_uploaded,
        "all done"
    );
    Ok(())
}
