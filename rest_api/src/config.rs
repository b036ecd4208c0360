// rest_api/src/config.rs

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};

pub const DEFAULT_REST_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_REST_API_PORT: u16 = 8082;
pub const DEFAULT_DATA_DIRECTORY: &str = "/tmp/pats_data";

/// Represents the configuration for the REST API server itself.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    pub host: String,
    pub port: u16,
    pub storage_engine_type: StorageEngineType,
    pub data_directory: String,
}

/// Enum for the supported storage engine types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngineType {
    Memory,
    Sled,
}

impl FromStr for StorageEngineType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageEngineType::Memory),
            "sled" => Ok(StorageEngineType::Sled),
            _ => Err(anyhow!("Unknown storage engine type: {}", s)),
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::Memory => f.write_str("memory"),
            StorageEngineType::Sled => f.write_str("sled"),
        }
    }
}

/// Loads the REST API configuration from the environment (a `.env` file is
/// honored when the binary loads one first), falling back to defaults:
/// `127.0.0.1:8082` with the in-memory engine.
pub fn load_rest_api_config() -> Result<RestApiConfig> {
    let host = env::var("REST_API_HOST").unwrap_or_else(|_| DEFAULT_REST_API_HOST.to_string());
    let port = match env::var("REST_API_PORT") {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow!("Invalid REST_API_PORT: {}", raw))?,
        Err(_) => DEFAULT_REST_API_PORT,
    };
    let storage_engine_type = match env::var("STORAGE_ENGINE_TYPE") {
        Ok(raw) => raw.parse()?,
        Err(_) => StorageEngineType::Memory,
    };
    let data_directory =
        env::var("STORAGE_DATA_DIRECTORY").unwrap_or_else(|_| DEFAULT_DATA_DIRECTORY.to_string());

    Ok(RestApiConfig {
        host,
        port,
        storage_engine_type,
        data_directory,
    })
}
