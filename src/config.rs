//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/paramtree/paramtree.toml`
//! 3. Explicit config file (`--config <path>`)
//! 4. Environment variables: `PARAMTREE_*` prefix, `__` between sections
//!    (e.g. `PARAMTREE_STORE__BACKEND=memory`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::infrastructure::cache::DEFAULT_TTL_SECS;

/// Where roots and nodes are kept.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, nothing persisted
    Memory,
    /// JSON file at `store.path`
    #[default]
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ApplicationError::Config {
                message: format!("unknown store backend: {other} (expected memory or file)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Store file for the `file` backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of a cached selection in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Fixed RNG seed; unset means seeded from OS entropy
    pub seed: Option<u64>,
}

/// Unified configuration for paramtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub selection: SelectionConfig,
}

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store: RawStoreConfig,
    pub cache: RawCacheConfig,
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStoreConfig {
    pub backend: Option<StoreBackend>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCacheConfig {
    pub enabled: Option<bool>,
    pub ttl_secs: Option<u64>,
}

/// Default store file: `<data dir>/paramtree/trees.json`.
fn default_store_path() -> PathBuf {
    ProjectDirs::from("", "", "paramtree")
        .map(|dirs| dirs.data_dir().join("trees.json"))
        .unwrap_or_else(|| PathBuf::from("~/.paramtree/trees.json"))
}

/// Get the XDG config directory for paramtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "paramtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("paramtree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; must exist if given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), config_file, None)
    }

    /// Layered load with every source explicit.
    ///
    /// `env` replaces the process environment as source for `PARAMTREE_*`
    /// overrides when given.
    pub fn load_from(
        global: Option<&Path>,
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config, optional
        if let Some(global_path) = global {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // 3. Explicit config file, required when named
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            current = current.merge_with(&load_raw_settings(path)?);
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current, env)?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Scalar merge: overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store: StoreConfig {
                backend: overlay.store.backend.unwrap_or(self.store.backend),
                path: overlay
                    .store
                    .path
                    .clone()
                    .unwrap_or_else(|| self.store.path.clone()),
            },
            cache: CacheConfig {
                enabled: overlay.cache.enabled.unwrap_or(self.cache.enabled),
                ttl_secs: overlay.cache.ttl_secs.unwrap_or(self.cache.ttl_secs),
            },
            selection: SelectionConfig {
                seed: overlay.selection.seed.or(self.selection.seed),
            },
        }
    }

    /// Apply PARAMTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let source = Environment::with_prefix("PARAMTREE")
            .prefix_separator("_")
            .separator("__")
            .source(env);
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store.backend") {
            settings.store.backend = val.parse()?;
        }
        if let Ok(val) = config.get_string("store.path") {
            settings.store.path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("cache.enabled") {
            settings.cache.enabled = parse_env("cache.enabled", &val)?;
        }
        if let Ok(val) = config.get_string("cache.ttl_secs") {
            settings.cache.ttl_secs = parse_env("cache.ttl_secs", &val)?;
        }
        if let Ok(val) = config.get_string("selection.seed") {
            settings.selection.seed = Some(parse_env("selection.seed", &val)?);
        }

        Ok(settings)
    }

    /// Expand shell variables and tilde in the store path.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.store.path.to_string_lossy().as_ref());
        self.store.path = PathBuf::from(expanded);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ApplicationError::Config {
                message: "cache.ttl_secs must be positive when the cache is enabled".into(),
            });
        }
        if self.store.backend == StoreBackend::File && self.store.path.as_os_str().is_empty() {
            return Err(ApplicationError::Config {
                message: "store.path is required for the file backend".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# paramtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/paramtree/paramtree.toml
#   File:   --config <path>
#   Env:    PARAMTREE_* environment variables, e.g. PARAMTREE_CACHE__TTL_SECS=60

[store]
# "file" keeps trees in a JSON file, "memory" keeps them for one process only
# backend = "file"
# path = "~/.local/share/paramtree/trees.json"

[cache]
# Repeat selections with identical selectors return the cached result
# enabled = true
# ttl_secs = 300

[selection]
# Fixed seed makes random walks reproducible
# seed = 42
"#
        .to_string()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ApplicationError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e| ApplicationError::Config {
        message: format!("invalid value for {key}: {val} ({e})"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
