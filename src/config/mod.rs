use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_NAME: &str = "voxpost";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative backend configuration
    pub backend: BackendConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the Generative Language API
    pub base_url: String,

    /// API key; the GEMINI_API_KEY environment variable takes precedence
    pub api_key: Option<String>,

    /// Faster model used for transcription
    pub transcription_model: String,

    /// Higher quality model used for rewriting and improvement
    pub rewrite_model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Key-value store holding permanent instructions
    pub store_path: Option<PathBuf>,

    /// Directory for exported documents
    pub export_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            transcription_model: "gemini-2.5-flash".to_string(),
            rewrite_model: "gemini-2.5-pro".to_string(),
            timeout_secs: 300,
        }
    }
}

impl BackendConfig {
    /// API key from the environment, falling back to the config file
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save().await {
                tracing::warn!("Could not write default config: {:#}", e);
            }
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("voxpost.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        Ok(Self::config_dir()?.join("config.yaml"))
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join(APP_NAME))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.transcription_model.trim().is_empty()
            || self.backend.rewrite_model.trim().is_empty()
        {
            anyhow::bail!("Both backend models must be configured");
        }

        if self.backend.timeout_secs == 0 {
            anyhow::bail!("Backend timeout must be greater than zero");
        }

        crate::source::validate_url(&self.backend.base_url)
            .context("Backend base_url must be an HTTP or HTTPS URL")?;

        Ok(())
    }

    /// Path of the key-value store, honouring an override
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.app.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("store.json")),
        }
    }

    /// Directory where exported documents are written
    pub fn export_dir(&self) -> Result<PathBuf> {
        match &self.app.export_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Could not determine current directory"),
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Backend URL: {}", self.backend.base_url);
        println!(
            "  API Key: {}",
            self.backend
                .resolved_api_key()
                .map(|key| mask_key(&key))
                .unwrap_or_else(|| "(not set)".to_string())
        );
        println!("  Transcription Model: {}", self.backend.transcription_model);
        println!("  Rewrite Model: {}", self.backend.rewrite_model);
        println!("  Timeout: {}s", self.backend.timeout_secs);
        match self.store_path() {
            Ok(path) => println!("  Instruction Store: {}", path.display()),
            Err(_) => println!("  Instruction Store: (unavailable)"),
        }
        if let Some(dir) = &self.app.export_dir {
            println!("  Export Directory: {}", dir.display());
        }
    }

    /// Print where the config file lives so it can be edited
    pub async fn interactive_setup(&self) -> Result<()> {
        println!("Edit the config file to change settings:");
        println!("  {}", Self::config_path()?.display());
        println!("The {} environment variable overrides backend.api_key.", API_KEY_ENV);
        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.transcription_model, "gemini-2.5-flash");
        assert_eq!(config.backend.rewrite_model, "gemini-2.5-pro");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.rewrite_model = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip_keeps_overrides() {
        let yaml = r#"
backend:
  base_url: http://localhost:8080
  api_key: abc
  transcription_model: fast
  rewrite_model: slow
  timeout_secs: 10
app:
  store_path: /tmp/voxpost-store.json
  export_dir: null
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.backend.rewrite_model, "slow");
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/voxpost-store.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-123456789"), "****6789");
        assert_eq!(mask_key("ab"), "****ab");
    }
}
