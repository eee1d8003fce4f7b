//! Import options and the automation targets they resolve to

use docdrop_common::config::ImportOptionConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Option property naming a chain to run
pub const CHAIN_ID_PROPERTY: &str = "chainId";

/// Option property naming a single operation to run
pub const OPERATION_ID_PROPERTY: &str = "operationId";

/// Target prefix marking a named chain (`Chain.<name>`)
pub const CHAIN_PREFIX: &str = "Chain.";

/// Id given to the one-step chain wrapping a single operation
pub const SINGLE_OPERATION_CHAIN_ID: &str = "operation";

/// A selectable import action
///
/// Loaded from the action registry and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOption {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ImportOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl From<ImportOptionConfig> for ImportOption {
    fn from(config: ImportOptionConfig) -> Self {
        Self {
            id: config.id,
            label: config.label,
            properties: config.properties,
        }
    }
}

/// Chain or operation identifier an import runs
///
/// Not validated: an unknown id only fails once the runner executes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationTarget(String);

impl OperationTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// How the runner must execute this target
    ///
    /// `Chain.<name>` runs the named chain; anything else becomes a one-step
    /// chain calling the operation with empty parameters.
    pub fn invocation(&self) -> Invocation {
        match self.0.strip_prefix(CHAIN_PREFIX) {
            Some(chain_name) => Invocation::Chain(chain_name.to_string()),
            None => Invocation::Operation(OperationChain::single(self.0.clone())),
        }
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runner call derived from an [`OperationTarget`]
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Chain(String),
    Operation(OperationChain),
}

/// Inline chain definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationChain {
    pub id: String,
    pub steps: Vec<OperationStep>,
}

impl OperationChain {
    /// One-step chain running `operation_id` with no parameters
    pub fn single(operation_id: impl Into<String>) -> Self {
        Self {
            id: SINGLE_OPERATION_CHAIN_ID.to_string(),
            steps: vec![OperationStep {
                id: operation_id.into(),
                params: BTreeMap::new(),
            }],
        }
    }
}

/// One operation call inside a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStep {
    pub id: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}
