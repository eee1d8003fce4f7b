//! Configuration loading and root folder resolution
//!
//! **Priority order** for every overridable setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "DOCDROP_CONFIG";

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "DOCDROP_ROOT_FOLDER";

/// How uploaded files reach the dispatcher
///
/// `Batch` is used by clients able to stream files into a server-side batch
/// ahead of the import; `Direct` carries the files with the import request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Batch,
    Direct,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upload section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload mode assigned to new sessions
    pub default_mode: UploadMode,
    /// Action category listing the selectable import options
    pub drop_context: String,
    /// Request body limit for multipart upload endpoints
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are cancelled and dropped
    pub session_ttl_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_mode: UploadMode::Batch,
            drop_context: "import".to_string(),
            max_upload_bytes: 100 * 1024 * 1024,
            session_ttl_secs: 3600,
        }
    }
}

/// Remote endpoint section (automation engine, document repository)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// One `[[import_options]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptionConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// May hold `chainId` or `operationId`
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_category() -> String {
    "import".to_string()
}

/// docdrop TOML configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: String,
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub upload: UploadConfig,
    pub automation: EndpointConfig,
    pub repository: EndpointConfig,
    pub import_options: Vec<ImportOptionConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5740".to_string(),
            root_folder: None,
            logging: LoggingConfig::default(),
            upload: UploadConfig::default(),
            automation: EndpointConfig::default(),
            repository: EndpointConfig::default(),
            import_options: Vec::new(),
        }
    }
}

/// Load a TOML config file
///
/// Missing file ⇒ warning + defaults. Unreadable or malformed file ⇒ `Error::Config`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}: {}", path.display(), e)))?;

    info!(
        path = %path.display(),
        import_options = config.import_options.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Resolve which config file to read: CLI → `DOCDROP_CONFIG` → platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::config_dir()
        .map(|d| d.join("docdrop").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./docdrop.toml"))
}

/// Root folder resolution (CLI → ENV → TOML → compiled default)
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    /// Resolve the root folder. Never fails: the compiled default is the last resort.
    pub fn resolve(&self, toml_config: &TomlConfig) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml_config.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("docdrop"))
        .unwrap_or_else(|| PathBuf::from("./docdrop_data"))
}

/// Creates the root folder layout on startup
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root, batch and staging directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.batches_dir(), self.staging_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!(path = %dir.display(), "Created directory");
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Server-side batch storage
    pub fn batches_dir(&self) -> PathBuf {
        self.root_folder.join("batches")
    }

    /// Parent of the per-attempt staging directories used by direct uploads
    pub fn staging_dir(&self) -> PathBuf {
        self.root_folder.join("staging")
    }
}
