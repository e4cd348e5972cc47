//! TOML-based engine configuration.
//!
//! Stores tuning for:
//! - The XP curve and challenge completion rewards
//! - Daily rotation (repeat avoidance, optional fixed seed)
//! - Persistence write coalescing
//!
//! Configuration is stored at `~/.config/stretchzone/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::progress::XpCurve;

/// XP curve and rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default = "default_base_xp")]
    pub base_xp: u64,
    #[serde(default = "default_xp_step")]
    pub xp_step: u64,
    /// Flat XP for completing any challenge.
    #[serde(default = "default_completion_base_xp")]
    pub completion_base_xp: u64,
    /// Extra XP per point of discomfort rating.
    #[serde(default = "default_xp_per_discomfort_point")]
    pub xp_per_discomfort_point: u64,
}

/// Daily challenge rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// How many previously active challenges a new day avoids.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Fixed RNG seed; random per launch when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Persistence behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Delay before a scheduled write runs, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/stretchzone/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub xp: XpConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

// Default functions
fn default_base_xp() -> u64 {
    100
}
fn default_xp_step() -> u64 {
    50
}
fn default_completion_base_xp() -> u64 {
    20
}
fn default_xp_per_discomfort_point() -> u64 {
    10
}
fn default_recent_window() -> usize {
    1
}
fn default_debounce_ms() -> u64 {
    150
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            xp_step: default_xp_step(),
            completion_base_xp: default_completion_base_xp(),
            xp_per_discomfort_point: default_xp_per_discomfort_point(),
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            seed: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl XpConfig {
    pub fn curve(&self) -> XpCurve {
        XpCurve::new(self.base_xp, self.xp_step)
    }

    /// XP for completing a challenge with the given rating.
    pub fn completion_reward(&self, discomfort_rating: u8) -> u64 {
        self.completion_base_xp.saturating_add(
            self.xp_per_discomfort_point
                .saturating_mul(discomfort_rating as u64),
        )
    }
}

impl PersistenceConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Keys backed by an `Option`; these accept "none", "null" or "" to clear.
const NULLABLE_KEYS: &[&str] = &["rotation.seed"];

/// TOML integers are signed 64-bit.
const TOML_INT_MAX: u64 = i64::MAX as u64;

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;
                let nullable = NULLABLE_KEYS.contains(&key);

                let new_value = match existing {
                    _ if nullable && matches!(value, "" | "none" | "null") => {
                        serde_json::Value::Null
                    }
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                    // Cleared optional numbers serialize as null.
                    serde_json::Value::Null if nullable => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.xp.base_xp == 0 {
            return Err(ConfigError::InvalidValue {
                key: "xp.base_xp".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.rotation.recent_window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rotation.recent_window".into(),
                message: "must be at least 1".into(),
            });
        }
        let integers = [
            ("xp.base_xp", self.xp.base_xp),
            ("xp.xp_step", self.xp.xp_step),
            ("xp.completion_base_xp", self.xp.completion_base_xp),
            ("xp.xp_per_discomfort_point", self.xp.xp_per_discomfort_point),
            ("rotation.recent_window", self.rotation.recent_window as u64),
            ("rotation.seed", self.rotation.seed.unwrap_or(0)),
            ("persistence.debounce_ms", self.persistence.debounce_ms),
        ];
        for (key, value) in integers {
            if value > TOML_INT_MAX {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("must be at most {TOML_INT_MAX}"),
                });
            }
        }
        Ok(())
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            CoreError::from(ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}
