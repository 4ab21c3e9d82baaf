use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Backend base URL used when the config file has no override.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub endpoint: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self { endpoint: None }
    }

    /// Base URL of the agent backend.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("invictus").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_endpoint_when_unset() {
        let config = Config::new();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn from_file_reads_the_endpoint_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoint": "http://10.0.0.5:9000"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint(), "http://10.0.0.5:9000");
    }

    #[test]
    fn from_file_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn empty_config_falls_back_to_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }
}
