use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// URL of the hosted call-token function
    pub endpoint: String,

    /// Bearer key for the token function, if it requires one
    pub api_key: Option<String>,

    /// Per-request timeout for token calls (in seconds)
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "findlife.db".to_string(),
            gateway: GatewayConfig {
                endpoint: "http://localhost:8787/call-token".to_string(),
                api_key: None,
                timeout_secs: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, then apply env overrides.
    /// A missing file is created with defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            let default_config = Self::default();
            default_config.save()?;
            default_config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("findlife").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var("FINDLIFE_DB") {
            self.database_path = db;
        }
        if let Ok(endpoint) = std::env::var("FINDLIFE_GATEWAY_ENDPOINT") {
            self.gateway.endpoint = endpoint;
        }
        if let Ok(key) = std::env::var("FINDLIFE_GATEWAY_KEY") {
            self.gateway.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database_path, "findlife.db");
        assert!(config.gateway.api_key.is_none());
        assert_eq!(config.gateway.timeout_secs, 10);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig {
            database_path: "/var/lib/findlife/findlife.db".to_string(),
            gateway: GatewayConfig {
                endpoint: "https://functions.example.com/call-token".to_string(),
                api_key: Some("secret".to_string()),
                timeout_secs: 5,
            },
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_path = "scratch.db"

[gateway]
endpoint = "http://localhost:9999/token"
timeout_secs = 3
"#,
        )
        .unwrap();

        let config = AppConfig::from_path(&path).unwrap();
        assert_eq!(config.database_path, "scratch.db");
        assert_eq!(config.gateway.endpoint, "http://localhost:9999/token");
        assert_eq!(config.gateway.timeout_secs, 3);
        assert!(config.gateway.api_key.is_none());
    }
}
