//! Direct-Upload Resolver
//!
//! Materializes uploaded files into blobs inside a staging directory owned by
//! the current attempt, runs the target over them, then removes the directory.

use crate::error::ImportError;
use crate::models::{
    Blob, ContextParams, OperationContext, OperationTarget, RepositorySession, UploadedFile,
};
use crate::services::file_names::clean_file_name;
use crate::types::OperationRunner;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

pub struct DirectUploadResolver {
    runner: Arc<dyn OperationRunner>,
    staging_root: PathBuf,
}

impl DirectUploadResolver {
    /// # Arguments
    /// * `runner` - Automation engine
    /// * `staging_root` - Parent directory of the per-attempt staging directories
    pub fn new(runner: Arc<dyn OperationRunner>, staging_root: PathBuf) -> Self {
        Self {
            runner,
            staging_root,
        }
    }

    /// Run `target` with `files` as input
    ///
    /// **Algorithm:**
    /// 1. No files → return, runner not called
    /// 2. Copy every file into a blob (first I/O failure aborts everything)
    /// 3. Build the context: blobs in file order + `params`
    /// 4. Run (chain prefix decides chain vs single operation)
    /// 5. Remove the staging directory, success or failure
    ///
    /// Takes ownership of `files`: no handle survives the call.
    pub async fn run(
        &self,
        files: Vec<UploadedFile>,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> Result<(), ImportError> {
        if files.is_empty() {
            tracing::debug!(operation = %target, "No uploaded files, nothing to import");
            return Ok(());
        }

        let file_count = files.len();
        let staging = self
            .create_staging_dir()
            .await
            .map_err(|source| ImportError::execution(target, source))?;

        tracing::info!(
            operation = %target,
            files = file_count,
            staging = %staging.path().display(),
            "Executing direct upload import"
        );

        let result = self
            .materialize_and_run(files, staging.path(), target, session, params)
            .await;

        remove_staging_dir(staging).await;

        result.map_err(|source| {
            tracing::error!(operation = %target, error = %source, "Error while executing automation batch");
            ImportError::execution(target, source)
        })
    }

    async fn create_staging_dir(&self) -> anyhow::Result<TempDir> {
        tokio::fs::create_dir_all(&self.staging_root)
            .await
            .with_context(|| format!("creating staging root {}", self.staging_root.display()))?;

        tempfile::Builder::new()
            .prefix("import-")
            .tempdir_in(&self.staging_root)
            .with_context(|| format!("creating staging directory in {}", self.staging_root.display()))
    }

    async fn materialize_and_run(
        &self,
        files: Vec<UploadedFile>,
        staging_dir: &Path,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> anyhow::Result<()> {
        let mut blobs = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            blobs.push(write_blob(staging_dir, index, file).await?);
        }

        let ctx = OperationContext::new(session.clone())
            .with_input(blobs)
            .with_params(params);

        self.runner.run_target(ctx, target).await?;
        Ok(())
    }
}

/// Delete the staging directory off the async workers
///
/// If the attempt is dropped before reaching this point, `TempDir`'s own
/// drop removes the directory instead.
async fn remove_staging_dir(staging: TempDir) {
    let staging_path = staging.path().to_path_buf();
    let result = tokio::task::spawn_blocking(move || staging.close()).await;

    let error = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };
    tracing::warn!(
        staging = %staging_path.display(),
        error = %error,
        "Failed to remove staging directory"
    );
}

/// Copy one upload into `<staging_dir>/<index>-<clean name>`
///
/// The index keeps two uploads with the same name apart.
pub(crate) async fn write_blob(
    staging_dir: &Path,
    index: usize,
    mut file: UploadedFile,
) -> anyhow::Result<Blob> {
    let filename = clean_file_name(file.name());
    let path = staging_dir.join(format!("{:04}-{}", index, filename));

    let mut out = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    let length = tokio::io::copy(file.reader_mut(), &mut out)
        .await
        .with_context(|| format!("copying upload '{}'", file.name()))?;
    out.flush().await?;

    Ok(Blob {
        filename,
        mime_type: file.content_type().to_string(),
        path,
        length,
    })
}
