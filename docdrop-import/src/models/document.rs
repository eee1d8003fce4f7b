//! Repository documents, permissions and the pending document model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Repository session the automation engine runs under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySession {
    pub repository: String,
    pub principal: String,
}

impl Default for RepositorySession {
    fn default() -> Self {
        Self {
            repository: "default".to_string(),
            principal: "system".to_string(),
        }
    }
}

/// Minimal document view used for folder resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub is_folder: bool,
}

impl DocumentSummary {
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }
}

/// Capabilities checked against the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Create documents inside a folder
    AddChildren,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::AddChildren => "AddChildren",
        }
    }
}

/// Where the client should go after a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationOutcome {
    pub document_id: String,
    pub view: String,
}

/// Metadata the user entered for the documents being imported
///
/// Schema name → field name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentModel {
    schemas: BTreeMap<String, BTreeMap<String, Value>>,
}

impl DocumentModel {
    pub fn set(&mut self, schema: impl Into<String>, field: impl Into<String>, value: Value) {
        self.schemas
            .entry(schema.into())
            .or_default()
            .insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.values().all(BTreeMap::is_empty)
    }

    /// Snapshot of every populated schema, keyed `schema:field`
    pub fn properties(&self) -> Value {
        let mut properties = Map::new();
        for (schema, fields) in &self.schemas {
            for (field, value) in fields {
                properties.insert(format!("{}:{}", schema, field), value.clone());
            }
        }
        Value::Object(properties)
    }
}
