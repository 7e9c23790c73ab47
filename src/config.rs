//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use std::env;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chunks::config::{ChunkBackend, ChunkConfig};
use crate::error::AppError;
use crate::permissions::PermissionMatrix;
use crate::records::config::{RecordBackend, RecordConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const CONFIG_PATH_ENV: &str = "GRIDVAULT_CONFIG";
pub const CHUNK_BACKEND_ENV: &str = "CHUNK_BACKEND";
pub const RECORD_BACKEND_ENV: &str = "RECORD_BACKEND";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chunks: ChunkConfig,
    pub records: RecordConfig,
    /// Roles allowed per resource and operation
    pub permissions: PermissionMatrix,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum request body size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 64 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `GRIDVAULT_CONFIG` or `config.yaml`, using
    /// defaults when the file does not exist
    pub fn load() -> Result<Self, AppError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load_from(&path)?
        } else {
            warn!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Backend selection from `CHUNK_BACKEND` and `RECORD_BACKEND`
    pub fn apply_env_overrides(&mut self) {
        if let Some(backend) = env_backend::<ChunkBackend>(CHUNK_BACKEND_ENV) {
            self.chunks.backend = backend;
        }
        if let Some(backend) = env_backend::<RecordBackend>(RECORD_BACKEND_ENV) {
            self.records.backend = backend;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.chunks.validate().map_err(AppError::Config)?;
        if self.server.workers == 0 {
            return Err(AppError::Config("server.workers must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_backend<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr<Err = String> + std::fmt::Debug,
{
    let value = env::var(name).ok()?;
    match value.parse::<T>() {
        Ok(backend) => {
            info!("Using backend from environment {}: {:?}", name, backend);
            Some(backend)
        }
        Err(e) => {
            warn!("Invalid backend in environment {}: {}. Keeping configured value.", name, e);
            None
        }
    }
}
