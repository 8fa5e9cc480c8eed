//! Dependency initialization and wiring for the XML indexer.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::events::{
    EventBusConfig, IndexingEventBus, IndexingSchedule, ItemIndexer, DEFAULT_CONFIG_DIRECTORY,
    DEFAULT_MAX_CONCURRENT_DISPATCHES,
};
use crate::fields_config::SharedFieldsConfig;
use crate::indexers::FileSystemItemIndexer;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::IndexingError;
use xml_indexer_repository::{
    CollectionIndexWriter, CollectionIndexWriterConfig, InMemoryIndexProvider, IndexingStatusLog,
    DEFAULT_STATUS_LOG_CAPACITY,
};

/// Id of the filesystem item indexer.
const FILESYSTEM_INDEXER_ID: &str = "filesystem";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// The loaded field extraction rules.
    pub fields_config: Arc<SharedFieldsConfig>,
}

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub fields_config: Option<PathBuf>,
    pub config_directory: PathBuf,
    pub schedule: Option<IndexingSchedule>,
    pub max_concurrent_dispatches: usize,
    pub status_log_capacity: usize,
    pub protected_collections: Vec<String>,
    pub index_on_startup: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XML_INDEXER_FIELDS_CONFIG`: Index document listing the field configuration files (optional)
    /// - `ITEM_INDEXER_CONFIG_DIR`: Directory handed to item indexers (default: ./config)
    /// - `INDEXING_START_TIME`: Daily start time in `H:mm` (optional; unset disables the timer)
    /// - `INDEXING_DAYS_OF_WEEK`: Comma separated days, 1 = Sunday (optional; unset means every day)
    /// - `MAX_CONCURRENT_DISPATCHES`: Bound on concurrent listener dispatches (default: 8)
    /// - `STATUS_LOG_CAPACITY`: Number of status messages retained (default: 750)
    /// - `PROTECTED_COLLECTIONS`: Comma separated collection keys that may not be deleted
    /// - `INDEX_ON_STARTUP`: Run a full pass once the indexers are ready (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Parsed settings
    /// * `Err(IndexingError)` - If the schedule is invalid
    pub fn from_env() -> Result<Self, IndexingError> {
        let fields_config = env::var("XML_INDEXER_FIELDS_CONFIG").ok().map(PathBuf::from);
        let config_directory = PathBuf::from(
            env::var("ITEM_INDEXER_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIRECTORY.to_string()),
        );

        let schedule = match env::var("INDEXING_START_TIME").ok().filter(|s| !s.trim().is_empty()) {
            Some(start_time) => {
                let days = env::var("INDEXING_DAYS_OF_WEEK").ok();
                Some(IndexingSchedule::parse(&start_time, days.as_deref())?)
            }
            None => None,
        };

        let max_concurrent_dispatches = env::var("MAX_CONCURRENT_DISPATCHES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DISPATCHES);
        let status_log_capacity = env::var("STATUS_LOG_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_STATUS_LOG_CAPACITY);
        let protected_collections = env::var("PROTECTED_COLLECTIONS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let index_on_startup = env::var("INDEX_ON_STARTUP")
            .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            fields_config,
            config_directory,
            schedule,
            max_concurrent_dispatches,
            status_log_capacity,
            protected_collections,
            index_on_startup,
        })
    }
}

impl Settings {
    /// When indexing passes run, as shown in the startup log.
    pub fn indexing_summary(&self) -> String {
        match (&self.schedule, self.index_on_startup) {
            (Some(schedule), startup) => format!(
                "daily at {} on {}{}",
                schedule.start_time().format("%-H:%M"),
                schedule.describe_days(),
                if startup { ", and once at startup" } else { "" }
            ),
            (None, true) => "once at startup".to_string(),
            (None, false) => "only when requested".to_string(),
        }
    }
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    pub async fn new() -> Result<Self, IndexingError> {
        Self::from_settings(Settings::from_env()?).await
    }

    /// Wire the indexer from already parsed settings.
    pub async fn from_settings(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            fields_config = ?settings.fields_config,
            config_directory = %settings.config_directory.display(),
            schedule = ?settings.schedule,
            max_concurrent_dispatches = settings.max_concurrent_dispatches,
            status_log_capacity = settings.status_log_capacity,
            "Initializing dependencies"
        );

        let fields_config = match &settings.fields_config {
            Some(path) => {
                let shared = SharedFieldsConfig::from_file(path).await?;
                let configs = shared.snapshot();
                info!(
                    configured_keys = configs.keys().len(),
                    load_errors = configs.load_errors().len(),
                    "Field extraction configuration loaded"
                );
                Arc::new(shared)
            }
            None => {
                info!("No field extraction configuration; only generic fields will be indexed");
                Arc::new(SharedFieldsConfig::empty())
            }
        };

        let status = Arc::new(IndexingStatusLog::new(settings.status_log_capacity));
        let writer = Arc::new(CollectionIndexWriter::with_config(
            Arc::new(InMemoryIndexProvider::new()),
            status,
            CollectionIndexWriterConfig::with_protected_collections(settings.protected_collections),
        ));

        let bus = Arc::new(IndexingEventBus::with_config(
            writer,
            EventBusConfig {
                max_concurrent_dispatches: settings.max_concurrent_dispatches,
                config_directory: settings.config_directory,
            },
        ));

        let indexers: Vec<Arc<dyn ItemIndexer>> = vec![Arc::new(FileSystemItemIndexer::new(
            FILESYSTEM_INDEXER_ID,
            fields_config.clone(),
        ))];

        let orchestrator = Orchestrator::with_config(
            bus,
            indexers,
            OrchestratorConfig {
                schedule: settings.schedule,
                index_on_startup: settings.index_on_startup,
                ..OrchestratorConfig::default()
            },
        );

        Ok(Self {
            orchestrator,
            fields_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(schedule: Option<IndexingSchedule>, index_on_startup: bool) -> Settings {
        Settings {
            fields_config: None,
            config_directory: PathBuf::from(DEFAULT_CONFIG_DIRECTORY),
            schedule,
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
            status_log_capacity: DEFAULT_STATUS_LOG_CAPACITY,
            protected_collections: Vec::new(),
            index_on_startup,
        }
    }

    #[test]
    fn test_indexing_summary() {
        let schedule = IndexingSchedule::parse("3:05", Some("1,7")).unwrap();
        assert_eq!(
            settings(Some(schedule.clone()), false).indexing_summary(),
            format!("daily at 3:05 on {}", schedule.describe_days())
        );
        assert!(settings(Some(schedule), true)
            .indexing_summary()
            .ends_with(", and once at startup"));
        assert_eq!(settings(None, true).indexing_summary(), "once at startup");
        assert_eq!(settings(None, false).indexing_summary(), "only when requested");
    }

    #[tokio::test]
    async fn test_from_settings_without_field_rules() {
        let deps = Dependencies::from_settings(settings(None, false)).await.unwrap();
        assert!(deps.fields_config.snapshot().keys().is_empty());
        assert!(deps.fields_config.source().is_none());
    }
}
