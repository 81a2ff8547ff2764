use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_DIR_PREFIX: &str = "sheet-sync";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Cell range in A1 notation, without the sheet name
    pub range: String,
    /// Read-only access when no service account is configured
    pub api_key: Option<String>,
    pub service_account_file: Option<PathBuf>,
    pub service_account_json: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:Z100".to_string(),
            api_key: None,
            service_account_file: None,
            service_account_json: None,
        }
    }
}

impl SheetsConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Raw service account JSON, read from the key file when one is configured
    pub fn service_account_text(&self) -> Result<Option<String>> {
        if let Some(json) = self.service_account_json.as_ref().filter(|j| !j.is_empty()) {
            return Ok(Some(json.clone()));
        }

        let Some(path) = &self.service_account_file else {
            return Ok(None);
        };

        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read service account file {:?}: {}",
                path, e
            ))
        })?;

        Ok(Some(contents))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before pending edits are written back
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    /// Extra attempts for a failed cell write before it is dropped
    pub write_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            request_timeout_secs: 30,
            write_retries: 1,
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        if !config_path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {:?}. Please create one.",
                config_path
            )));
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get the cache directory path
    pub fn cache_dir() -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.get_cache_home()
            .ok_or_else(|| AppError::Config("Failed to determine cache directory".to_string()))
    }
}
