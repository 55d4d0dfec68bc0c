use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!(
                "Unknown store backend '{}', expected json, sqlite or memory",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: String,
    pub store_backend: StoreBackend,
    pub collections_path: String,
    pub db_path: String,
    pub media_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; unset keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_path = lookup("PIX_GALLERY_DATA_PATH").unwrap_or_else(|| "./data".to_string());

        Ok(Config {
            store_backend: lookup("PIX_GALLERY_STORE")
                .unwrap_or_else(|| "json".to_string())
                .parse()?,
            collections_path: lookup("PIX_GALLERY_COLLECTIONS_PATH")
                .unwrap_or_else(|| format!("{}/collections", data_path)),
            db_path: lookup("PIX_GALLERY_DB_PATH")
                .unwrap_or_else(|| format!("{}/database/gallery.db", data_path)),
            media_path: lookup("PIX_GALLERY_MEDIA_PATH")
                .unwrap_or_else(|| format!("{}/media", data_path)),
            data_path,
        })
    }
}
