use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Persistent settings from `~/.config/substitch/config.toml`. Every field is
/// optional; CLI flags and environment variables take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("substitch").join("config.toml"))
    }
}

/// Fully resolved credentials and endpoint for one run.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub api_base: String,
}

impl ApiSettings {
    /// Resolution order: CLI flag, then environment, then config file.
    pub fn resolve(key_flag: Option<String>, base_flag: Option<String>) -> Result<Self> {
        let file = FileConfig::load()?;

        let api_key = key_flag
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .or(file.api_key)
            .context(
                "No API key found. Provide one via --api-key, the OPENAI_API_KEY environment \
                 variable, or api_key in ~/.config/substitch/config.toml",
            )?;

        let api_base = base_flag
            .or_else(|| env::var("OPENAI_API_BASE").ok())
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self { api_key, api_base })
    }
}
