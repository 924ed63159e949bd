//! TOML configuration for a [`crate::Platform`].
//!
//! ```toml
//! [schema]
//! sources = ["schema/app.json"]
//!
//! [decode]
//! wildcard_merge = false
//! max_depth = 64
//!
//! [encode]
//! password_policy = "hashed_and_encrypted"
//! pretty = false
//! ```

use arbor_core::{decode::DecodeOptions, encode::EncodeOptions, meta::Source};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config '{name}' is invalid: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config '{name}' lists no schema sources")]
    NoSources { name: String },
}

///
/// ArborConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArborConfig {
    pub schema: SchemaConfig,
    pub decode: DecodeOptions,
    pub encode: EncodeOptions,
}

///
/// SchemaConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Meta-model documents, loaded in order.
    pub sources: Vec<PathBuf>,
}

impl ArborConfig {
    /// Parse a config held in memory; relative paths stay as written.
    pub fn from_toml_str(name: &str, text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            name: name.to_string(),
            source,
        })?;
        if config.schema.sources.is_empty() {
            return Err(ConfigError::NoSources {
                name: name.to_string(),
            });
        }

        Ok(config)
    }

    /// Read a config file. Relative schema paths are taken from the
    /// directory holding the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&path.to_string_lossy(), &text)?;

        if let Some(dir) = path.parent() {
            for source in &mut config.schema.sources {
                if source.is_relative() {
                    *source = dir.join(&*source);
                }
            }
        }

        Ok(config)
    }

    #[must_use]
    pub fn schema_sources(&self) -> Vec<Source> {
        self.schema.sources.iter().map(Source::file).collect()
    }
}
