//! User settings, read from `<config dir>/grid-cropper/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CROP_SIZE: i32 = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crop side length for points without a size of their own.
    pub default_crop_size: i32,
    /// Size change per adjust-size shortcut.
    pub size_step: i32,
    /// Upper end of the size slider.
    pub max_crop_size: i32,
    /// Folder created inside the chosen export location.
    pub export_dir_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_crop_size: DEFAULT_CROP_SIZE,
            size_step: 5,
            max_crop_size: 1000,
            export_dir_name: "cropper-export".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("grid-cropper").join("config.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Settings from the default location. A missing file gives defaults;
    /// an unreadable one is logged and also gives defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("using default settings: {e:#}");
                Self::default()
            }
        }
    }
}
