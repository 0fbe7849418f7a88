//! Optional `reqparse.toml` configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reqparse_core::{FlagTable, ResolveOptions};
use serde::Deserialize;

pub(crate) const DEFAULT_CONFIG: &str = "reqparse.toml";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error parsing config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid alias in config: {0}")]
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub include_nested: bool,
    pub detect_cycles: bool,
    /// Extra flag spellings, mapped to an existing spelling.
    pub aliases: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            include_nested: true,
            detect_cycles: true,
            aliases: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `explicit` if given, else `reqparse.toml` from the working
    /// directory if it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG);
                if !fallback.is_file() {
                    return Ok(Config::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Config::from_toml(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn resolve_options(&self) -> Result<ResolveOptions, ConfigError> {
        let mut flags = FlagTable::standard();
        for (alias, existing) in &self.aliases {
            flags = flags
                .with_alias(alias, existing)
                .map_err(ConfigError::Alias)?;
        }
        Ok(ResolveOptions {
            include_nested: self.include_nested,
            detect_cycles: self.detect_cycles,
            flags,
        })
    }
}
