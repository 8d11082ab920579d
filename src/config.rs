use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::XeroError;

pub const CONFIG_FILE_NAME: &str = "xero-explorer.json";
pub const DATABASE_FILE_NAME: &str = "xerophyta_db.sqlite";
pub const DEFAULT_COMMIT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub default_species: Option<String>,
    #[serde(default)]
    pub commit_batch_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub database: Utf8PathBuf,
    pub default_species: Option<String>,
    pub commit_batch_size: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `./xero-explorer.json` is
    /// used when present and defaults apply otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, XeroError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| XeroError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| XeroError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, XeroError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(XeroError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let database = match config.database.filter(|path| !path.trim().is_empty()) {
            Some(path) => Utf8PathBuf::from(path),
            None => default_database_path()?,
        };

        let commit_batch_size = match config.commit_batch_size {
            Some(0) => {
                return Err(XeroError::ConfigParse(
                    "commit_batch_size must be at least 1".to_string(),
                ));
            }
            Some(size) => size,
            None => DEFAULT_COMMIT_BATCH_SIZE,
        };

        Ok(ResolvedConfig {
            schema_version,
            database,
            default_species: config
                .default_species
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            commit_batch_size,
        })
    }
}

pub fn default_database_path() -> Result<Utf8PathBuf, XeroError> {
    let base = BaseDirs::new()
        .ok_or_else(|| XeroError::Filesystem("unable to resolve home directory".to_string()))?;
    let data_dir = Utf8PathBuf::from_path_buf(base.data_local_dir().to_path_buf())
        .map_err(|_| XeroError::Filesystem("data directory is not valid UTF-8".to_string()))?;
    Ok(data_dir.join("xero-explorer").join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_database_wins() {
        let config = Config {
            database: Some("data/xero.sqlite".to_string()),
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.database, Utf8PathBuf::from("data/xero.sqlite"));
        assert_eq!(resolved.commit_batch_size, DEFAULT_COMMIT_BATCH_SIZE);
        assert!(resolved.default_species.is_none());
    }
}
