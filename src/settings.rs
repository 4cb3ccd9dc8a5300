//! User settings: scale, output format, quality and background toggle.
//!
//! Persisted as JSON under a `pluginSettings` object with camelCase keys.
//! Missing keys take their defaults; an unreadable file falls back to the
//! defaults entirely.

use crate::{Error, ImageFormat, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Device pixels per CSS pixel in the output
    pub screenshot_scale: f64,
    pub image_format: ImageFormat,
    /// Lossy encoder quality, 0..=1
    pub image_quality: f64,
    /// Skip the background capture and leave the canvas transparent
    pub no_background: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screenshot_scale: 1.8,
            image_format: ImageFormat::Jpeg,
            image_quality: 0.92,
            no_background: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsFile {
    plugin_settings: Settings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(self.screenshot_scale.is_finite() && self.screenshot_scale > 0.0) {
            return Err(Error::Config(format!(
                "screenshotScale must be positive, got {}",
                self.screenshot_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.image_quality) {
            return Err(Error::Config(format!(
                "imageQuality must be within 0..1, got {}",
                self.image_quality
            )));
        }
        Ok(())
    }

    /// Parse the persisted JSON document
    pub fn from_json(json: &str) -> Result<Settings> {
        let file: SettingsFile = serde_json::from_str(json)?;
        file.plugin_settings.validate()?;
        Ok(file.plugin_settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&SettingsFile {
            plugin_settings: self.clone(),
        })?)
    }

    /// Load from disk; a missing file yields defaults, an invalid one is logged
    /// and yields defaults.
    pub fn load(path: &Path) -> Settings {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Settings::default(),
            Err(e) => {
                log::error!("Failed to read settings {}: {}; using defaults", path.display(), e);
                return Settings::default();
            }
        };
        match Settings::from_json(&text) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to load settings {}: {}; using defaults", path.display(), e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
