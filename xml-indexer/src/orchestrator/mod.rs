//! Orchestrator module for the XML indexer.
//!
//! Wires item indexers into the event bus, starts the daily schedule and
//! keeps the process alive until it is asked to stop.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, instrument, warn};

use crate::events::{IndexingEventBus, IndexingSchedule, ItemIndexer};
use crate::IndexingError;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Daily indexing schedule, or `None` to index only on request.
    pub schedule: Option<IndexingSchedule>,
    /// Fire a full pass as soon as the indexers are ready.
    pub index_on_startup: bool,
    /// How often the index size is logged.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            schedule: None,
            index_on_startup: false,
            progress_interval: Duration::from_secs(60),
        }
    }
}

/// Orchestrator that drives the indexing lifecycle.
///
/// The orchestrator:
/// - Registers the item indexers with the event bus
/// - Announces that the index writer is ready
/// - Starts the daily indexing timer
/// - Handles shutdown signals and aborts running passes
pub struct Orchestrator {
    bus: Arc<IndexingEventBus>,
    indexers: Vec<Arc<dyn ItemIndexer>>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(bus: Arc<IndexingEventBus>, indexers: Vec<Arc<dyn ItemIndexer>>) -> Self {
        Self::with_config(bus, indexers, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        bus: Arc<IndexingEventBus>,
        indexers: Vec<Arc<dyn ItemIndexer>>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            bus,
            indexers,
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn bus(&self) -> &Arc<IndexingEventBus> {
        &self.bus
    }

    /// Handle that stops [`Orchestrator::run`] when sent to.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the orchestrator.
    ///
    /// Blocks until a shutdown signal is received, then aborts any running
    /// pass and waits for the indexers to acknowledge.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IndexingError> {
        info!("Starting XML indexer orchestrator");

        self.bus.writer().provider().ensure_index_exists().await?;

        if self.indexers.is_empty() {
            return Err(IndexingError::config("No item indexers are configured"));
        }
        for indexer in &self.indexers {
            let report = self.bus.register(indexer.clone()).wait().await;
            if !report.failed.is_empty() {
                warn!(indexer = indexer.id(), "Item indexer failed to initialize");
            }
        }

        self.bus.fire_indexer_ready(None)?.wait().await;

        if let Some(first_run) = self.bus.schedule(self.config.schedule.clone()) {
            info!(first_run = %first_run, "Automatic indexing scheduled");
        }
        if self.config.index_on_startup {
            self.bus.fire_index_all_collections(None)?;
        }

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = progress_timer.tick() => {
                    match self.bus.writer().num_docs().await {
                        Ok(num_docs) => info!(
                            num_docs,
                            collections = self.bus.writer().configured_collections().len(),
                            "Index status"
                        ),
                        Err(e) => warn!(error = %e, "Unable to read index size"),
                    }
                }
            }
        }

        let report = self.bus.shutdown()?.wait().await;
        info!(
            indexers_notified = report.dispatched(),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
