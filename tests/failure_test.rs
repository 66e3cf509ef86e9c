use std::fs;
use std::sync::Arc;
use tempfile::Builder;

use spimi::block::{BlockBuilder, BlockBuilderConfig, MemoryBudget};
use spimi::document::DocumentRecord;
use spimi::error::{Result, SpimiError};
use spimi::merge::{BlockMerger, MergeConfig, MergeStrategy};
use spimi::query::QueryEngine;
use spimi::storage::{
    FileStorage, MemoryStorage, Storage, StorageConfig, StorageInput, StorageOutput,
};

/// Storage that refuses to create outputs whose name starts with `deny`.
#[derive(Debug)]
struct DenyingStorage {
    inner: MemoryStorage,
    deny: &'static str,
}

impl DenyingStorage {
    fn check(&self, name: &str) -> Result<()> {
        if name.starts_with(self.deny) {
            Err(SpimiError::storage(format!("no space left for {name}")))
        } else {
            Ok(())
        }
    }
}

impl Storage for DenyingStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.inner.open_input(name)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check(name)?;
        self.inner.create_output(name)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.inner.file_exists(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.inner.delete_file(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.inner.list_files()
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.inner.file_size(name)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.inner.rename_file(old_name, new_name)
    }

    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)> {
        self.check(prefix)?;
        self.inner.create_temp_output(prefix)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

fn records() -> Vec<DocumentRecord> {
    vec![
        DocumentRecord::new(1, ["car"]),
        DocumentRecord::new(2, ["bus", "car"]),
        DocumentRecord::new(3, ["bus"]),
    ]
}

fn write_blocks(storage: Arc<dyn Storage>) -> u32 {
    let config = BlockBuilderConfig {
        budget: MemoryBudget::Records(1),
        ..Default::default()
    };
    let mut builder = BlockBuilder::new(storage, config).unwrap();
    builder.invert_all(records()).unwrap();
    builder.blocks_written()
}

#[test]
fn test_unwritable_dictionary_is_reported() {
    let storage = Arc::new(DenyingStorage {
        inner: MemoryStorage::new_default(),
        deny: "dictionary",
    });
    let blocks = write_blocks(storage.clone());
    assert_eq!(blocks, 3);

    for strategy in [MergeStrategy::PairwiseFold, MergeStrategy::KWay] {
        let config = MergeConfig {
            strategy,
            ..Default::default()
        };
        let err = BlockMerger::new(storage.clone(), config)
            .unwrap()
            .merge_numbered("block", blocks)
            .unwrap_err();

        assert!(err.to_string().contains("no space left"), "{strategy:?}: {err}");
        assert!(!storage.file_exists("dictionary.txt"));
    }
}

#[test]
fn test_unwritable_block_is_reported() {
    let storage = Arc::new(DenyingStorage {
        inner: MemoryStorage::new_default(),
        deny: "block2",
    });
    let config = BlockBuilderConfig {
        budget: MemoryBudget::Records(1),
        ..Default::default()
    };
    let mut builder = BlockBuilder::new(storage.clone(), config).unwrap();

    let err = builder.invert_all(records()).unwrap_err();
    assert!(matches!(err, SpimiError::Storage(_)));
    assert_eq!(builder.blocks_written(), 1);
    assert_eq!(storage.list_files().unwrap(), vec!["block1.txt".to_string()]);
}

#[test]
fn test_missing_block_file_is_reported() {
    let dir = Builder::new().prefix("test_missing_block").tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), StorageConfig::default()).unwrap());
    let blocks = write_blocks(storage.clone());
    fs::remove_file(dir.path().join("block2.txt")).unwrap();

    let err = BlockMerger::new(storage.clone(), MergeConfig::default())
        .unwrap()
        .merge_numbered("block", blocks)
        .unwrap_err();

    assert!(matches!(err, SpimiError::Storage(_)));
    assert!(!dir.path().join("dictionary.txt").exists());
}

#[test]
fn test_malformed_block_names_file_and_line() {
    let dir = Builder::new().prefix("test_malformed_block").tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), StorageConfig::default()).unwrap());
    let blocks = write_blocks(storage.clone());
    fs::write(dir.path().join("block3.txt"), "bus : [3]\ncar [4]\n").unwrap();

    for strategy in [MergeStrategy::PairwiseFold, MergeStrategy::KWay] {
        let config = MergeConfig {
            strategy,
            ..Default::default()
        };
        let err = BlockMerger::new(storage.clone(), config)
            .unwrap()
            .merge_numbered("block", blocks)
            .unwrap_err();

        match err {
            SpimiError::Parse { file, line, .. } => {
                assert_eq!(file, "block3.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("dictionary.txt").exists());
    }
}

#[test]
fn test_unsorted_dictionary_is_rejected() {
    let storage = MemoryStorage::new_default();
    storage
        .put("dictionary.txt", "car : [1]\nbus : [2]\n")
        .unwrap();

    let err = QueryEngine::open(&storage, "dictionary.txt").unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_term_with_delimiter_is_rejected() {
    let storage = Arc::new(MemoryStorage::new_default());
    let mut builder = BlockBuilder::new(storage.clone(), BlockBuilderConfig::default()).unwrap();

    let err = builder
        .invert_all(vec![DocumentRecord::new(1, ["odd : [term"])])
        .unwrap_err();

    assert!(matches!(err, SpimiError::InvalidTerm { .. }));
    assert!(storage.list_files().unwrap().is_empty());
}
