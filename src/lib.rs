pub mod config;
pub mod error;
pub mod ingest;
pub mod sheets;
pub mod warehouse;

pub use config::Config;
pub use error::IngestError;
