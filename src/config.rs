// SPDX-License-Identifier: GPL-3.0-only

//! Site configuration
//!
//! Stored as JSON at `<config_dir>/footscan/config.json`. Every section
//! falls back to the defaults in [`crate::constants`], so a partial file
//! only overrides what it names.

use crate::app::frame_processor::{MonitorSettings, QualityThresholds};
use crate::app::state::CaptureMode;
use crate::backends::camera::FacingMode;
use crate::constants::capture as defaults;
use crate::errors::{AppError, AppResult};
use crate::pipelines::foot_model::{GeometryParams, PressureParams};
use crate::pipelines::video::ExtractionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const APP_DIR: &str = "footscan";
const CONFIG_FILE: &str = "config.json";

/// Guided capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Hard cap on a video take, in seconds
    pub max_recording_secs: f64,
    /// Images needed to complete a non-simulated scan
    pub min_images: usize,
    pub photo_jpeg_quality: u8,
    pub target_width: u32,
    pub target_height: u32,
    pub default_mode: CaptureMode,
    pub default_facing: FacingMode,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_recording_secs: defaults::MAX_RECORDING_DURATION.as_secs_f64(),
            min_images: defaults::MIN_IMAGES,
            photo_jpeg_quality: defaults::PHOTO_JPEG_QUALITY,
            target_width: defaults::TARGET_WIDTH,
            target_height: defaults::TARGET_HEIGHT,
            default_mode: CaptureMode::default(),
            default_facing: FacingMode::default(),
        }
    }
}

impl CaptureSettings {
    /// Recording cap as a duration; invalid values fall back to the default
    pub fn max_recording(&self) -> Duration {
        if self.max_recording_secs.is_finite() && self.max_recording_secs > 0.0 {
            Duration::from_secs_f64(self.max_recording_secs)
        } else {
            defaults::MAX_RECORDING_DURATION
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quality: QualityThresholds,
    pub monitor: MonitorSettings,
    pub capture: CaptureSettings,
    pub extraction: ExtractionConfig,
    pub geometry: GeometryParams,
    pub pressure: PressureParams,
}

impl Config {
    /// Default location, if the platform has a config directory
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults when missing or malformed
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting any failure
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::path()
            .ok_or_else(|| AppError::Config("No config directory available".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }
}
