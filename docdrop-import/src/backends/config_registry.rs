//! Action registry backed by the `[[import_options]]` tables of the TOML config

use crate::models::ImportOption;
use crate::types::ActionRegistry;
use anyhow::Result;
use async_trait::async_trait;
use docdrop_common::config::ImportOptionConfig;

pub struct ConfigActionRegistry {
    /// (category, option) in declaration order
    actions: Vec<(String, ImportOption)>,
}

impl ConfigActionRegistry {
    pub fn new(configs: Vec<ImportOptionConfig>) -> Self {
        let actions = configs
            .into_iter()
            .map(|config| (config.category.clone(), ImportOption::from(config)))
            .collect();
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[async_trait]
impl ActionRegistry for ConfigActionRegistry {
    async fn list_actions(&self, category: &str) -> Result<Vec<ImportOption>> {
        Ok(self
            .actions
            .iter()
            .filter(|(action_category, _)| action_category == category)
            .map(|(_, option)| option.clone())
            .collect())
    }
}
