//! XML Indexer Main Entry Point
//!
//! Reads the indexer settings from the environment, wires the event bus and
//! the filesystem item indexer, then runs until interrupted.

use dotenv::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xml_indexer::{Dependencies, IndexingError, Settings};

const DEFAULT_LOG_FILTER: &str = "xml_indexer=info,xml_indexer_repository=info";

/// Initialize tracing. `LOG_FORMAT=json` selects structured output for log
/// shippers; anything else gets the console format.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let initialized = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
    };
    initialized.map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))
}

/// Summarize what this run will do before anything is started.
fn log_settings(settings: &Settings) {
    info!(
        service_version = env!("CARGO_PKG_VERSION"),
        config_directory = %settings.config_directory.display(),
        index_on_startup = settings.index_on_startup,
        max_concurrent_dispatches = settings.max_concurrent_dispatches,
        "Starting XML Indexer"
    );

    match &settings.fields_config {
        Some(path) => info!(fields_config = %path.display(), "Using field extraction rules"),
        None => warn!("XML_INDEXER_FIELDS_CONFIG is not set; records get generic fields only"),
    }

    info!(indexing = %settings.indexing_summary(), "Indexing schedule");
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();
    init_tracing()?;

    let settings = Settings::from_env().inspect_err(|e| error!(error = %e, "Invalid indexer settings"))?;
    log_settings(&settings);

    let mut deps = Dependencies::from_settings(settings)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to initialize dependencies"))?;

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("XML indexer stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "XML indexer failed");
            Err(e)
        }
    }
}
