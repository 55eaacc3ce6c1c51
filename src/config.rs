use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const CONFIG_PATH_VAR: &str = "ESTIMATOR_CONFIG";
pub const BIND_ADDR_VAR: &str = "ESTIMATOR_BIND_ADDR";
pub const DATABASE_VAR: &str = "ESTIMATOR_DATABASE";
pub const MODEL_DIR_VAR: &str = "ESTIMATOR_MODEL_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            database_path: PathBuf::from("data/estimator.sqlite3"),
            model_dir: PathBuf::from("models"),
        }
    }
}

impl ServerConfig {
    /// Defaults, then the JSON file named by `ESTIMATOR_CONFIG`, then the
    /// individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(BIND_ADDR_VAR) {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup(DATABASE_VAR) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(MODEL_DIR_VAR) {
            self.model_dir = PathBuf::from(dir);
        }
    }
}
