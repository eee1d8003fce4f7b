//! Uploaded files and the blobs materialized from them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use tokio::io::AsyncRead;

/// Content type used when the client declares none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file handed over by the web layer
///
/// The byte stream is read at most once, when a resolver or batch store
/// consumes the file.
pub struct UploadedFile {
    name: String,
    content_type: String,
    reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
}

impl UploadedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: Option<String>,
        reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            reader,
        }
    }

    /// In-memory upload (multipart field, tests)
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(name, content_type, Box::new(Cursor::new(data.into())))
    }

    /// Name as sent by the client (not sanitized)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn reader_mut(&mut self) -> &mut (dyn AsyncRead + Send + Sync + Unpin) {
        self.reader.as_mut()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Named, typed binary content given to an operation as input
///
/// `path` is only valid while the owner of the backing file (staging
/// directory or batch) is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub filename: String,
    pub mime_type: String,
    pub path: PathBuf,
    pub length: u64,
}

impl Blob {
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}
