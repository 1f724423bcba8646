use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::canvas::ChannelMask;
use crate::components::tools::{BrushProperties, BrushSizeLimits};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("could not access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Editor defaults, stored as TOML.
///
/// Missing keys take their default, so an older or hand-trimmed file still
/// loads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Size of a canvas created with "New Texture".
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Fill color of a new canvas (straight RGBA).
    pub canvas_color: [u8; 4],
    pub channel_mask: ChannelMask,
    pub brush: BrushProperties,
    pub brush_size: BrushSizeLimits,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            canvas_width: 1024,
            canvas_height: 1024,
            canvas_color: [255, 255, 255, 255],
            channel_mask: ChannelMask::ALL,
            brush: BrushProperties::default(),
            brush_size: BrushSizeLimits::default(),
        }
    }
}

impl EditorSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read and sanitize settings from `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?.sanitized())
    }

    /// Like [`load`](Self::load), but any failure falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("settings: {} unusable ({e}), using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Pull out-of-range values back to something usable.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let limits = &mut self.brush_size;
        if !(limits.min.is_finite() && limits.min > 0.0) {
            limits.min = defaults.brush_size.min;
        }
        if !limits.max.is_finite() {
            limits.max = defaults.brush_size.max;
        }
        if limits.max < limits.min {
            std::mem::swap(&mut limits.min, &mut limits.max);
        }
        if !(limits.factor.is_finite() && limits.factor > 0.0) {
            limits.factor = defaults.brush_size.factor;
        }

        let brush = &mut self.brush;
        brush.size = if brush.size.is_finite() {
            self.brush_size.clamp(brush.size)
        } else {
            self.brush_size.clamp(defaults.brush.size)
        };
        brush.hardness = clamp_unit(brush.hardness, defaults.brush.hardness);
        brush.strength = clamp_unit(brush.strength, defaults.brush.strength);
        if !(brush.density.is_finite() && brush.density > 0.0) {
            brush.density = defaults.brush.density;
        }

        if self.canvas_width == 0 || self.canvas_height == 0 {
            self.canvas_width = defaults.canvas_width;
            self.canvas_height = defaults.canvas_height;
        }
        self
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { fallback }
}
