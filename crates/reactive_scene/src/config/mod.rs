//! Configuration system
//!
//! Scene-wide tunables (gravity, timestep clamps, spring defaults, asset
//! roots) loaded from TOML or RON. Every field has a default so a partial
//! file only overrides what it names.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

use crate::spring::{SpringParams, DEFAULT_MAX_STEP_SECS};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Physics bridge tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Initial world gravity
    pub gravity: [f32; 3],

    /// Upper bound of a single simulation step in seconds
    pub max_timestep_secs: f32,

    /// Skin width kept between a character controller and obstacles
    pub character_offset: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            max_timestep_secs: 0.2,
            character_offset: 0.05,
        }
    }
}

/// Spring animation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Upper bound of the time a spring integrates in one frame, in seconds
    pub max_step_secs: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            max_step_secs: DEFAULT_MAX_STEP_SECS,
        }
    }
}

/// Asset store tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory searched by the file-backed asset loader
    pub root: PathBuf,

    /// Emit a debug line the first time each asset starts loading
    pub log_loads: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            log_loads: true,
        }
    }
}

/// Top-level scene configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Physics settings
    pub physics: PhysicsConfig,

    /// Parameters used by springs created without explicit parameters
    pub spring: SpringParams,

    /// Spring stepping settings
    pub animation: AnimationConfig,

    /// Asset settings
    pub assets: AssetConfig,
}

impl Config for SceneConfig {}
