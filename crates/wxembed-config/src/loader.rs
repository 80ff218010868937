//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.wxembed/config.toml`
//! 2. Local config: `.wxembed/config.toml` (in the working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, EmbeddingSettings, LoggingConfig, WatsonxSettings, WxConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".wxembed";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".wxembed";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.wxembed`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<WxConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.wxembed`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a directory.
    pub fn local_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        dir: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<WxConfig, ConfigError> {
        let mut config = WxConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(dir)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load configuration from one explicit file, then apply overrides.
    ///
    /// Global and local files are ignored.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<WxConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = load_config_file(path)?;
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<WxConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a directory.
    pub fn load_local(&self, dir: &Path) -> Result<Option<WxConfig>, ConfigError> {
        let local_path = self.local_config_path(dir);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Create `~/.wxembed/config.toml` with defaults unless it exists.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        init_config_dir(global_dir)
    }

    /// Create `<dir>/.wxembed/config.toml` with defaults unless it exists.
    pub fn init_local(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&dir.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(config_dir: &Path) -> Result<PathBuf, ConfigError> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::create_dir(config_dir, e))?;
    }

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &WxConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<WxConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &WxConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Optional values in the overlay win when set; plain values win when they
/// differ from the default.
fn merge_configs(base: WxConfig, overlay: WxConfig) -> WxConfig {
    WxConfig {
        watsonx: merge_watsonx(base.watsonx, overlay.watsonx),
        embedding: merge_embedding(base.embedding, overlay.embedding),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

fn merge_watsonx(base: WatsonxSettings, overlay: WatsonxSettings) -> WatsonxSettings {
    let default = WatsonxSettings::default();
    WatsonxSettings {
        platform: overlay.platform.or(base.platform),
        base_url: overlay.base_url.or(base.base_url),
        region: pick(base.region, overlay.region, default.region),
        project_id: overlay.project_id.or(base.project_id),
        auth_type: overlay.auth_type.or(base.auth_type),
        username: overlay.username.or(base.username),
        api_key_env: pick(base.api_key_env, overlay.api_key_env, default.api_key_env),
        password_env: pick(base.password_env, overlay.password_env, default.password_env),
        timeout_secs: pick(base.timeout_secs, overlay.timeout_secs, default.timeout_secs),
    }
}

fn merge_embedding(base: EmbeddingSettings, overlay: EmbeddingSettings) -> EmbeddingSettings {
    let default = EmbeddingSettings::default();
    EmbeddingSettings {
        model_id: overlay.model_id.or(base.model_id),
        max_retries: pick(base.max_retries, overlay.max_retries, default.max_retries),
        retry_base_delay_ms: pick(
            base.retry_base_delay_ms,
            overlay.retry_base_delay_ms,
            default.retry_base_delay_ms,
        ),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let default = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, default.level),
        format: pick(base.format, overlay.format, default.format),
    }
}
