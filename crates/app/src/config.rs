//! `qbank.toml` plus environment and command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File consulted when `--config` is not given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "qbank.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Question bank JSON file.
    pub questions_path: PathBuf,
    /// User store JSON file.
    pub users_path: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub default_num_questions: usize,
    /// Fixed seed for question sampling; random when absent.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions_path: PathBuf::from("questions.json"),
            users_path: PathBuf::from("users.json"),
            log_filter: "info".to_string(),
            default_num_questions: 10,
            seed: None,
        }
    }
}

/// Values given on the command line. `None` leaves the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub questions_path: Option<PathBuf>,
    pub users_path: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not valid TOML for this shape.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid configuration")
    }

    /// Read `path`, or `qbank.toml` in the working directory when no path is
    /// given. Only an explicit path is required to exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file fails to
    /// read or parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.exists() => anyhow::bail!("config file not found: {}", p.display()),
            Some(p) => p.to_path_buf(),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Apply `QBANK_QUESTIONS`, `QBANK_USERS` and `QBANK_SEED` as returned by
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `QBANK_SEED` is not an unsigned integer.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("QBANK_QUESTIONS") {
            self.questions_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("QBANK_USERS") {
            self.users_path = PathBuf::from(path);
        }
        if let Some(seed) = lookup("QBANK_SEED") {
            let seed = seed
                .trim()
                .parse()
                .with_context(|| format!("QBANK_SEED must be an unsigned integer, got {seed:?}"))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(path) = overrides.questions_path {
            self.questions_path = path;
        }
        if let Some(path) = overrides.users_path {
            self.users_path = path;
        }
        if let Some(filter) = overrides.log_filter {
            self.log_filter = filter;
        }
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
    }

    /// File, then process environment, then command line.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`] and [`AppConfig::apply_env`].
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        Ok(config)
    }
}
