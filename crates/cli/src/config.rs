//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use success_lib::{TrainerConfig, DEFAULT_MODEL_PATH};

/// Settings merged from an optional config file and `SUCCESS_*` env vars.
///
/// Nested keys use `__` in env vars, e.g.
/// `SUCCESS_TRAINER__PIPELINE__FOREST__N_ESTIMATORS=50`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub trainer: TrainerConfig,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration; a given file must exist
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("SUCCESS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}
