use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path::PathBuf};
use tracing::debug;

use crate::providers::open_exchange_rates::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub const APP_ID_ENV: &str = "OXR_APP_ID";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub app_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base currency used when none is given on the command line
    pub base: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_id: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            base: None,
            symbols: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Loads the config file at the default location, falling back to defaults
    /// when it does not exist. The environment app id always wins.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            Self::default().with_env_overrides()
        };
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "openexchangerates", "oxrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        self.with_app_id_override(env::var(APP_ID_ENV).ok())
    }

    /// Replaces `app_id` with `env_value` unless the latter is blank.
    pub fn with_app_id_override(mut self, env_value: Option<String>) -> Self {
        if let Some(app_id) = env_value.filter(|id| !id.trim().is_empty()) {
            debug!("Using app id from {APP_ID_ENV}");
            self.app_id = Some(app_id);
        }
        self
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let app_id = self
            .app_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .with_context(|| {
                format!("No app id configured: set app_id in the config file or {APP_ID_ENV}")
            })?;

        if self.timeout_secs == 0 {
            anyhow::bail!("Invalid timeout_secs: must be at least 1 second");
        }

        Ok(ClientConfig::new(app_id)
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}
