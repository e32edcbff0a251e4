//! Configuration
//!
//! One explicit configuration object, built at the process entry point and
//! passed into components; nothing reads ambient state after construction.
//! Layering: built-in defaults, then an optional TOML file, then
//! environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://apps.abacus.ai/v1/chat/completions";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Errors while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Optional keys accepted from the TOML file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    maintenance_token: Option<String>,
    storage_root: Option<PathBuf>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    verbose: Option<bool>,
}

/// Effective configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Model endpoint URL
    pub endpoint: String,

    /// Model name sent with each generation request
    pub model: String,

    /// Bearer credential for the model endpoint
    pub api_key: Option<String>,

    /// Secret the maintenance caller must present
    pub maintenance_token: Option<String>,

    /// Root directory for local object and metadata storage
    pub storage_root: PathBuf,

    /// Completion budget per generation request
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Emit progress lines on stderr
    pub verbose: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            maintenance_token: None,
            storage_root: PathBuf::from(format!("{home}/.local/share/tile-forge")),
            max_tokens: 3000,
            temperature: 0.7,
            verbose: false,
        }
    }
}

impl ForgeConfig {
    /// Load configuration: defaults, then `path` (when given), then the
    /// `FORGE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = path {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let file: ConfigFile = toml::from_str(&text)?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if file.maintenance_token.is_some() {
            self.maintenance_token = file.maintenance_token;
        }
        if let Some(root) = file.storage_root {
            self.storage_root = root;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(verbose) = file.verbose {
            self.verbose = verbose;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = env::var("FORGE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(model) = env::var("FORGE_MODEL") {
            self.model = model;
        }
        if let Ok(key) = env::var("FORGE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(token) = env::var("FORGE_MAINTENANCE_TOKEN") {
            self.maintenance_token = Some(token);
        }
        if let Ok(root) = env::var("FORGE_STORAGE_ROOT") {
            self.storage_root = PathBuf::from(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 3000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(
            &path,
            r#"
model = "tile-model-large"
max_tokens = 1024
verbose = true
"#,
        )
        .unwrap();

        let config = ForgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model, "tile-model-large");
        assert_eq!(config.max_tokens, 1024);
        assert!(config.verbose);
        // Untouched keys keep their defaults
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ForgeConfig::load(Some(Path::new("/nonexistent/forge.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(&path, "model = [not toml").unwrap();

        assert!(matches!(
            ForgeConfig::load(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }
}
