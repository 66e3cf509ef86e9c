//! Top-level configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::BlockBuilderConfig;
use crate::collect::CollectorConfig;
use crate::error::{Result, SpimiError};
use crate::merge::MergeConfig;
use crate::storage::StorageConfig;

/// Configuration for the whole indexing pipeline.
///
/// Every section falls back to its defaults when omitted from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpimiConfig {
    /// Storage backend settings.
    pub storage: StorageConfig,
    /// Block building settings.
    pub builder: BlockBuilderConfig,
    /// Merge settings.
    pub merge: MergeConfig,
    /// Parallel record collection settings.
    pub collector: CollectorConfig,
}

impl SpimiConfig {
    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        if self.storage.buffer_size == 0 {
            return Err(SpimiError::invalid_config("storage buffer_size must be positive"));
        }
        self.builder.validate()?;
        self.merge.validate()?;
        if self.merge.dictionary_name.starts_with(&self.builder.block_prefix) {
            return Err(SpimiError::invalid_config(format!(
                "dictionary_name {:?} must not start with the block prefix {:?}",
                self.merge.dictionary_name, self.builder.block_prefix
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SpimiError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: SpimiConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBudget;
    use crate::merge::MergeStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = SpimiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.builder.block_prefix, "block");
        assert_eq!(config.merge.dictionary_name, "dictionary.txt");
        assert!(!config.merge.delete_blocks);
        assert_eq!(config.collector.join_timeout(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SpimiConfig = serde_json::from_str(
            r#"{"builder": {"budget": {"records": 500}}, "merge": {"strategy": "kway"}}"#,
        )
        .unwrap();

        assert_eq!(config.builder.budget, MemoryBudget::Records(500));
        assert_eq!(config.builder.block_prefix, "block");
        assert_eq!(config.merge.strategy, MergeStrategy::KWay);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SpimiConfig::default();
        config.builder.budget = MemoryBudget::Records(0);
        assert!(config.validate().is_err());

        let mut config = SpimiConfig::default();
        config.builder.block_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = SpimiConfig::default();
        config.merge.dictionary_name = "../dictionary.txt".to_string();
        assert!(config.validate().is_err());

        let mut config = SpimiConfig::default();
        config.merge.dictionary_name = "block_all.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_round_trip() {
        let mut config = SpimiConfig::default();
        config.builder.budget = MemoryBudget::Bytes(4096);
        config.merge.delete_blocks = true;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        assert_eq!(SpimiConfig::from_json_file(file.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = SpimiConfig::from_json_file("/nonexistent/spimi.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
