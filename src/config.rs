//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestset/nestset.toml`
//! 3. Local config: `<data_dir>/.nestset.toml`
//! 4. Environment variables: `NESTSET_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Tuning of the hierarchy engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// How often a mutation is re-run after a transient store failure
    pub max_retries: u32,
    /// Run the full consistency check inside every mutation before commit
    pub verify_after_write: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            verify_after_write: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawEngineSettings {
    pub max_retries: Option<u32>,
    pub verify_after_write: Option<bool>,
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub engine: RawEngineSettings,
}

/// Unified configuration for nestset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the hierarchy stores (default: ~/.nestset)
    pub data_dir: PathBuf,
    pub engine: EngineSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            engine: EngineSettings::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".nestset"))
        .unwrap_or_else(|| PathBuf::from("~/.nestset"))
}

/// Get the XDG config directory for nestset.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestset").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestset.toml"))
}

/// Get the path to the local config file in a data directory.
pub fn local_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".nestset.toml")
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables are left as written.
fn expand(text: &str) -> String {
    shellexpand::full(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

impl Settings {
    /// Store file of the folder hierarchy.
    pub fn folders_path(&self) -> PathBuf {
        self.data_dir.join("folders.toml")
    }

    /// Store file of the taxonomy hierarchy.
    pub fn taxonomies_path(&self) -> PathBuf {
        self.data_dir.join("taxonomies.toml")
    }

    fn expand_paths(&mut self) {
        self.data_dir = PathBuf::from(expand(self.data_dir.to_string_lossy().as_ref()));
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            engine: EngineSettings {
                max_retries: overlay
                    .engine
                    .max_retries
                    .unwrap_or(self.engine.max_retries),
                verify_after_write: overlay
                    .engine
                    .verify_after_write
                    .unwrap_or(self.engine.verify_after_write),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `data_dir` (e.g. from the command line) replaces the configured data
    /// directory before the local config file is looked up; environment
    /// variables still win over everything.
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = data_dir {
            current.data_dir = dir.to_path_buf();
        }
        current.expand_paths();

        let local_path = local_config_path(&current.data_dir);
        if local_path.exists() {
            debug!("load: local config {}", local_path.display());
            current = current.merge_with(&load_raw_settings(&local_path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply NESTSET_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("NESTSET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        match config.get::<u32>("engine.max_retries") {
            Ok(val) => settings.engine.max_retries = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }
        match config.get_bool("engine.verify_after_write") {
            Ok(val) => settings.engine.verify_after_write = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# nestset configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/nestset/nestset.toml
#   Local:  <data_dir>/.nestset.toml
#   Env:    NESTSET_* environment variables (NESTSET_ENGINE__MAX_RETRIES=3)

# Directory holding folders.toml and taxonomies.toml
# data_dir = "~/.nestset"

[engine]
# Re-run a mutation this many times after a transient store failure
# max_retries = 2

# Check every structural invariant before each commit (slow on big trees)
# verify_after_write = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
