//! Store configuration
//!
//! Administrative properties of one partition. They are set before
//! `init()` and frozen afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::observability::{Event, Logger};

/// One user index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Attribute name or OID
    pub attribute: String,

    /// Cache size hint for the index tables (default: 100)
    #[serde(default = "default_index_cache_size")]
    pub cache_size: usize,
}

impl IndexConfig {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            cache_size: default_index_cache_size(),
        }
    }
}

/// Partition store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Partition identifier (default: "example")
    #[serde(default = "default_partition_id")]
    pub partition_id: String,

    /// Suffix DN of the partition
    #[serde(default)]
    pub suffix: String,

    /// Directory holding the tables; in-memory when absent
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Entry cache size hint (default: 10000)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Sync every table after each mutation (default: false)
    #[serde(default)]
    pub sync_on_write: bool,

    /// Attributes with a user index
    #[serde(default)]
    pub indexed_attributes: Vec<IndexConfig>,
}

fn default_partition_id() -> String {
    "example".to_string()
}

fn default_cache_size() -> usize {
    10_000
}

fn default_index_cache_size() -> usize {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            partition_id: default_partition_id(),
            suffix: String::new(),
            working_directory: None,
            cache_size: default_cache_size(),
            sync_on_write: false,
            indexed_attributes: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// In-memory configuration for `suffix`
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..Default::default()
        }
    }

    /// Reads a JSON configuration file
    pub fn from_json_file(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            StoreError::invalid_config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            StoreError::invalid_config(format!("invalid config {}: {}", path.display(), e))
        })?;
        Logger::info(
            Event::ConfigLoaded.as_str(),
            &[
                ("path", &path.display().to_string()),
                ("partition", &config.partition_id),
                ("indices", &config.indexed_attributes.len().to_string()),
            ],
        );
        Ok(config)
    }

    /// Adds a user index unless one is already configured
    pub fn index(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        if !self
            .indexed_attributes
            .iter()
            .any(|i| i.attribute.eq_ignore_ascii_case(&attribute))
        {
            self.indexed_attributes.push(IndexConfig::new(attribute));
        }
        self
    }

    pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.partition_id, "example");
        assert_eq!(config.cache_size, 10_000);
        assert!(config.working_directory.is_none());
        assert!(!config.sync_on_write);
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::with_suffix("dc=example")
            .index("ou")
            .index("OU")
            .index("uid");
        assert_eq!(config.indexed_attributes.len(), 2);
        assert_eq!(config.indexed_attributes[0].cache_size, 100);
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partition.json");
        fs::write(
            &path,
            r#"{"suffix": "dc=example", "indexed_attributes": [{"attribute": "ou"}]}"#,
        )
        .unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.suffix, "dc=example");
        assert_eq!(config.partition_id, "example");
        assert_eq!(config.indexed_attributes, vec![IndexConfig::new("ou")]);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partition.json");
        fs::write(&path, "not json").unwrap();

        let err = StoreConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.code(), crate::store::StoreErrorCode::InvalidConfig);
    }
}
