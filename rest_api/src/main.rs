// rest_api/src/main.rs

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rest_api::config::{StorageEngineType, load_rest_api_config};
use rest_api::start_server;
use rest_api::storage::{InMemoryPatientStore, PatientStore, SledPatientStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_rest_api_config().context("Failed to load REST API configuration")?;
    info!(
        "Patient Membership REST API server starting on http://{}:{} ({} storage)",
        config.host, config.port, config.storage_engine_type
    );

    let store: Arc<dyn PatientStore> = match config.storage_engine_type {
        StorageEngineType::Memory => Arc::new(InMemoryPatientStore::new()),
        StorageEngineType::Sled => Arc::new(
            SledPatientStore::open(&config.data_directory)
                .context("Failed to open sled patient store")?,
        ),
    };

    start_server(config, store).await
}
