//! Code generation settings
//!
//! Settings are read from TOML. Without an explicit path, `sheetscript.toml`
//! in the working directory is used, then `sheetscript/config.toml` in the
//! user config directory. Missing files leave the defaults in place.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use etcetera::{BaseStrategy, choose_base_strategy};
use log::debug;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "sheetscript.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Combine adjacent code chunks before emitting the program
    pub optimize: bool,
    /// Emit a comment describing each chunk
    pub description_comments: bool,
    /// Parse the generated program and fail if it is not valid Python
    pub validate_syntax: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimize: true,
            description_comments: true,
            validate_syntax: false,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        match choose_base_strategy() {
            Ok(strategy) => paths.push(strategy.config_dir().join("sheetscript").join("config.toml")),
            Err(err) => debug!("No user config directory: {err}"),
        }
        paths
    }
}
