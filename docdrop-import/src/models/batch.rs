//! Batch identifiers

use chrono::Utc;
use uuid::Uuid;

/// Mint a new batch id: `batch-<epoch_millis>-<uuid v4>`
pub fn generate_batch_id() -> String {
    format!(
        "batch-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Batch ids become directory names, so only `[A-Za-z0-9_-]` is accepted
pub fn is_valid_batch_id(batch_id: &str) -> bool {
    !batch_id.is_empty()
        && batch_id.len() <= 128
        && batch_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
