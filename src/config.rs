//! YAML configuration. Every key is optional; omitted keys take the stock
//! dataset's values.

use std::path::Path;

use image::Rgb;
use serde::Deserialize;

use crate::contours::{ContourStyle, StrokeColoring};
use crate::controller::ViewerSettings;
use crate::error::{Result, ViewerError};
use crate::path::{Background, ImagePathResolver};
use crate::surface::Extent;
use crate::threshold::ThresholdParams;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatasetConfig {
    pub dir: String,
    pub background: Background,
    pub extension: String,
    pub first_index: u32,
    pub last_index: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dir: "img".to_owned(),
            background: Background::Clear,
            extension: "png".to_owned(),
            first_index: 1,
            last_index: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub primary_title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 800,
            primary_title: "Meteorite".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContourConfig {
    pub stroke_color: [u8; 3],
    pub stroke_width: u32,
    pub coloring: StrokeColoring,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            stroke_color: [0, 255, 0],
            stroke_width: 3,
            coloring: StrokeColoring::Uniform,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub dataset: DatasetConfig,
    pub window: WindowConfig,
    pub start_index: u32,
    pub threshold: ThresholdParams,
    pub contour: ContourConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            window: WindowConfig::default(),
            start_index: 1,
            threshold: ThresholdParams::default(),
            contour: ContourConfig::default(),
        }
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ViewerError::InvalidConfig(message()))
    }
}

impl Config {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Checks invariants serde defaults cannot express.
    pub fn validated(self) -> Result<Self> {
        let dataset = &self.dataset;
        ensure(dataset.first_index >= 1, || {
            "dataset.first-index must be at least 1".to_owned()
        })?;
        ensure(dataset.first_index <= dataset.last_index, || {
            format!(
                "dataset.first-index ({}) exceeds dataset.last-index ({})",
                dataset.first_index, dataset.last_index
            )
        })?;
        ensure(
            (dataset.first_index..=dataset.last_index).contains(&self.start_index),
            || {
                format!(
                    "start-index {} is outside {}..={}",
                    self.start_index, dataset.first_index, dataset.last_index
                )
            },
        )?;
        ensure(self.window.width > 0 && self.window.height > 0, || {
            "window width and height must be positive".to_owned()
        })?;
        ensure(self.contour.stroke_width >= 1, || {
            "contour.stroke-width must be at least 1".to_owned()
        })?;
        self.threshold.validate()?;
        Ok(self)
    }

    pub fn viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            resolver: ImagePathResolver::new(
                self.dataset.dir.clone(),
                self.dataset.background,
                self.dataset.extension.clone(),
            ),
            first_index: self.dataset.first_index,
            last_index: self.dataset.last_index,
            extent: Extent {
                width: self.window.width,
                height: self.window.height,
            },
            primary_title: self.window.primary_title.clone(),
            threshold: self.threshold.clone(),
            contour: ContourStyle {
                color: Rgb(self.contour.stroke_color),
                width: self.contour.stroke_width,
                coloring: self.contour.coloring,
            },
        }
    }
}
