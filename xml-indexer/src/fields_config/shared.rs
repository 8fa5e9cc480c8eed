//! Hot-reloadable handle on the loaded configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::info;

use super::FieldExtractionConfigs;
use crate::errors::ConfigError;

/// Shared, swappable configuration set.
///
/// Readers take a snapshot and keep using it for the rest of their record;
/// `reload` swaps in a freshly loaded set for subsequent readers.
#[derive(Debug)]
pub struct SharedFieldsConfig {
    source: Option<PathBuf>,
    current: RwLock<Arc<FieldExtractionConfigs>>,
}

impl SharedFieldsConfig {
    pub fn new(configs: FieldExtractionConfigs, source: Option<PathBuf>) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(configs)),
        }
    }

    /// No rules at all: generic-only extraction.
    pub fn empty() -> Self {
        Self::new(FieldExtractionConfigs::empty(), None)
    }

    /// Load from an index document, remembering it for later reloads.
    pub async fn from_file(index_file: &Path) -> Result<Self, ConfigError> {
        let configs = FieldExtractionConfigs::load(index_file).await?;
        Ok(Self::new(configs, Some(index_file.to_path_buf())))
    }

    /// The configuration in effect right now.
    pub fn snapshot(&self) -> Arc<FieldExtractionConfigs> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the configuration set.
    pub fn replace(&self, configs: FieldExtractionConfigs) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(configs);
    }

    /// Re-read the index document this handle was loaded from.
    ///
    /// Files are read through `tokio::fs`, so a reload can run inside an
    /// event handler. Without a source file the current set is kept. On failure the current
    /// set also stays in effect.
    pub async fn reload(&self) -> Result<Arc<FieldExtractionConfigs>, ConfigError> {
        let Some(source) = &self.source else {
            return Ok(self.snapshot());
        };

        let configs = FieldExtractionConfigs::load(source).await?;
        info!(
            source = %source.display(),
            configured_keys = configs.keys().len(),
            "Reloaded field extraction configuration"
        );
        self.replace(configs);
        Ok(self.snapshot())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Default for SharedFieldsConfig {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"<XMLIndexerFieldsConfig xmlFormat="oai_dc"/>"#;

    #[tokio::test]
    async fn test_snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.xml");
        std::fs::write(&index, "<XMLIndexerFieldsConfigIndex/>").unwrap();
        std::fs::write(dir.path().join("dc.xml"), CONFIG).unwrap();

        let shared = SharedFieldsConfig::from_file(&index).await.unwrap();
        let before = shared.snapshot();
        assert!(!before.is_configured("oai_dc"));

        std::fs::write(
            &index,
            "<XMLIndexerFieldsConfigIndex><configurationFiles>\
             <configurationFile>dc.xml</configurationFile>\
             </configurationFiles></XMLIndexerFieldsConfigIndex>",
        )
        .unwrap();
        shared.reload().await.unwrap();

        assert!(!before.is_configured("oai_dc"));
        assert!(shared.snapshot().is_configured("oai_dc"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.xml");
        std::fs::write(&index, "<XMLIndexerFieldsConfigIndex/>").unwrap();

        let shared = SharedFieldsConfig::from_file(&index).await.unwrap();
        std::fs::remove_file(&index).unwrap();

        assert!(shared.reload().await.is_err());
        assert!(shared.snapshot().keys().is_empty());
    }

    #[tokio::test]
    async fn test_reload_without_source_is_noop() {
        let shared = SharedFieldsConfig::empty();
        assert!(shared.reload().await.unwrap().keys().is_empty());
    }
}
