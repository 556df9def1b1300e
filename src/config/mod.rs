mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level sizefit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub fitting: FittingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(find_config_file)
            .unwrap_or_else(|| PathBuf::from("sizefit.json"));

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            load_config_file(&config_path)?
        } else if path.is_some() {
            anyhow::bail!("Config file '{}' does not exist", config_path.display());
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        // Older deployments used TELEGRAM_API_KEY; the canonical name wins.
        if let Ok(token) = std::env::var("TELEGRAM_API_KEY") {
            self.telegram.apply_token(&token);
        }

        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.apply_token(&token);
        }

        if let Ok(level) = std::env::var("SIZEFIT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(secs) = std::env::var("SIZEFIT_PROCESSING_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.telegram.processing_timeout_secs = Some(secs);
            }
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("sizefit.json"),
        PathBuf::from("sizefit.yaml"),
        PathBuf::from("sizefit.yml"),
        PathBuf::from("sizefit.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".sizefit").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load configuration from a file path.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => {
            // Try JSON5 first, then regular JSON
            json5::from_str(&content).or_else(|_| {
                serde_json::from_str(&content).map_err(|e| json5::Error::Message {
                    msg: e.to_string(),
                    location: None,
                })
            })?
        }
    };

    Ok(config)
}
