//! Filesystem Batch Store
//!
//! **Layout:** `<root>/<batch_id>/<index>.bin` holds the bytes of the
//! `index`-th upload, `<root>/<batch_id>/<index>.json` its name and content
//! type. Indices are zero-padded so directory order is upload order.

use crate::models::{
    is_valid_batch_id, Blob, ContextParams, OperationContext, OperationTarget, RepositorySession,
    UploadedFile,
};
use crate::services::clean_file_name;
use crate::types::{BatchStore, OperationRunner};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const DATA_EXTENSION: &str = "bin";
const MANIFEST_EXTENSION: &str = "json";

/// Sidecar describing one staged upload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StagedFile {
    filename: String,
    mime_type: String,
}

pub struct FsBatchStore {
    root: PathBuf,
    runner: Arc<dyn OperationRunner>,
}

impl FsBatchStore {
    /// # Arguments
    /// * `root` - Directory holding one subdirectory per batch
    /// * `runner` - Automation engine batches are executed with
    pub fn new(root: PathBuf, runner: Arc<dyn OperationRunner>) -> Self {
        Self { root, runner }
    }

    fn batch_dir(&self, batch_id: &str) -> Result<PathBuf> {
        if !is_valid_batch_id(batch_id) {
            bail!("Invalid batch id: {:?}", batch_id);
        }
        Ok(self.root.join(batch_id))
    }

    /// Manifests of the batch in upload order
    async fn staged_files(dir: &Path) -> Result<Vec<(PathBuf, StagedFile)>> {
        let mut manifests: Vec<PathBuf> = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION) {
                manifests.push(path);
            }
        }
        manifests.sort();

        let mut staged = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            let raw = tokio::fs::read(&manifest)
                .await
                .with_context(|| format!("reading {}", manifest.display()))?;
            let file: StagedFile = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing {}", manifest.display()))?;
            staged.push((manifest.with_extension(DATA_EXTENSION), file));
        }
        Ok(staged)
    }

    async fn run_batch(
        &self,
        dir: &Path,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> Result<Value> {
        let mut blobs = Vec::new();
        for (path, staged) in Self::staged_files(dir).await? {
            let length = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("missing batch data {}", path.display()))?
                .len();
            blobs.push(Blob {
                filename: staged.filename,
                mime_type: staged.mime_type,
                path,
                length,
            });
        }

        let ctx = OperationContext::new(session.clone())
            .with_input(blobs)
            .with_params(params);
        self.runner.run_target(ctx, target).await
    }
}

#[async_trait]
impl BatchStore for FsBatchStore {
    async fn add_file(&self, batch_id: &str, mut file: UploadedFile) -> Result<()> {
        let dir = self.batch_dir(batch_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating batch directory {}", dir.display()))?;

        let index = Self::staged_files(&dir).await?.len();
        let stem = dir.join(format!("{:06}", index));
        let data_path = stem.with_extension(DATA_EXTENSION);

        let mut out = tokio::fs::File::create(&data_path)
            .await
            .with_context(|| format!("creating {}", data_path.display()))?;
        let length = tokio::io::copy(file.reader_mut(), &mut out)
            .await
            .with_context(|| format!("copying upload '{}'", file.name()))?;
        out.flush().await?;

        // Manifest last: a file only counts once its bytes are on disk
        let staged = StagedFile {
            filename: clean_file_name(file.name()),
            mime_type: file.content_type().to_string(),
        };
        tokio::fs::write(stem.with_extension(MANIFEST_EXTENSION), serde_json::to_vec(&staged)?)
            .await?;

        tracing::debug!(
            batch_id = %batch_id,
            index = index,
            file = %staged.filename,
            bytes = length,
            "File added to batch"
        );
        Ok(())
    }

    async fn has_batch(&self, batch_id: &str) -> bool {
        let Ok(dir) = self.batch_dir(batch_id) else {
            return false;
        };
        match Self::staged_files(&dir).await {
            Ok(staged) => !staged.is_empty(),
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, error = %e, "Failed to inspect batch");
                false
            }
        }
    }

    async fn execute_and_clean(
        &self,
        batch_id: &str,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> Result<Value> {
        let dir = self.batch_dir(batch_id)?;

        tracing::info!(batch_id = %batch_id, operation = %target, "Running batch");
        let result = self.run_batch(&dir, target, session, params).await;

        if let Err(e) = self.clean(batch_id).await {
            tracing::warn!(batch_id = %batch_id, error = %e, "Failed to remove batch after run");
        }
        result
    }

    async fn clean(&self, batch_id: &str) -> Result<()> {
        let dir = self.batch_dir(batch_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(batch_id = %batch_id, "Batch removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
        }
    }
}
