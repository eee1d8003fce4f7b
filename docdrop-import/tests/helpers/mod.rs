//! Test Helper Utilities
//!
//! Shared fixtures for docdrop-import integration tests

#![allow(dead_code)]

pub mod log_capture;
pub mod mocks;

pub use log_capture::{init_test_logging, LogCapture};
pub use mocks::{
    doc, MemoryBatchStore, MemoryRepository, MockNavigation, RecordingRunner, RunnerCall,
    StaticRegistry,
};

use docdrop_common::config::UploadMode;
use docdrop_import::models::{ImportOption, RepositorySession, UploadedFile};
use docdrop_import::{Collaborators, DispatcherConfig, ImportDispatcher};
use std::path::Path;
use std::sync::Arc;

/// Collaborators of one test dispatcher, kept for inspection
pub struct Fixture {
    pub batch_store: Arc<MemoryBatchStore>,
    pub runner: Arc<RecordingRunner>,
    pub navigation: Arc<MockNavigation>,
    pub registry: Arc<StaticRegistry>,
}

impl Fixture {
    pub fn new(options: Vec<ImportOption>, navigation: MockNavigation) -> Self {
        Self {
            batch_store: Arc::new(MemoryBatchStore::default()),
            runner: Arc::new(RecordingRunner::default()),
            navigation: Arc::new(navigation),
            registry: Arc::new(StaticRegistry::new(options)),
        }
    }

    pub fn with_runner(mut self, runner: RecordingRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn with_batch_store(mut self, store: MemoryBatchStore) -> Self {
        self.batch_store = Arc::new(store);
        self
    }

    pub fn with_registry(mut self, registry: StaticRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn dispatcher(&self, mode: UploadMode, staging_root: &Path) -> ImportDispatcher {
        let collaborators = Collaborators {
            batch_store: self.batch_store.clone(),
            runner: self.runner.clone(),
            navigation: self.navigation.clone(),
            registry: self.registry.clone(),
        };
        ImportDispatcher::new(
            collaborators,
            RepositorySession::default(),
            DispatcherConfig {
                upload_mode: mode,
                drop_context: "import".to_string(),
                staging_root: staging_root.to_path_buf(),
            },
        )
    }
}

pub fn text_file(name: &str, body: &str) -> UploadedFile {
    UploadedFile::from_bytes(name, Some("text/plain".to_string()), body.as_bytes().to_vec())
}
