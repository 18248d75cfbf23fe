//! In-memory collaborators for driving the viewer without a screen or a
//! filesystem.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;

use crate::error::{Result, ViewerError};
use crate::io::{ChannelMode, DisplaySurface, ImageCodec, InputSource, Key};

/// Serves decodes from a fixed table of rasters. Paths not in the table fail
/// the way a missing file would.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    images: HashMap<PathBuf, DynamicImage>,
    encoded: RefCell<HashMap<PathBuf, DynamicImage>>,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, image: DynamicImage) {
        self.images.insert(path.into(), image);
    }

    pub fn encoded(&self, path: &Path) -> Option<DynamicImage> {
        self.encoded.borrow().get(path).cloned()
    }
}

impl ImageCodec for MemoryCodec {
    fn decode(&self, path: &Path, mode: ChannelMode) -> Result<DynamicImage> {
        let image = self
            .images
            .get(path)
            .ok_or_else(|| ViewerError::DecodeFailure {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(std::io::ErrorKind::NotFound.into()),
            })?;
        Ok(mode.convert(image.clone()))
    }

    fn encode(&self, path: &Path, raster: &DynamicImage) -> Result<()> {
        self.encoded
            .borrow_mut()
            .insert(path.to_path_buf(), raster.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Created { name: String, width: u32, height: u32 },
    Shown { name: String },
    Destroyed { name: String },
}

#[derive(Debug, Clone)]
struct Window {
    width: u32,
    height: u32,
    shown: Option<DynamicImage>,
}

/// Keeps open windows and their last shown raster in memory and logs every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    windows: BTreeMap<String, Window>,
    events: Vec<DisplayEvent>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.windows.contains_key(name)
    }

    pub fn open_windows(&self) -> Vec<&str> {
        self.windows.keys().map(String::as_str).collect()
    }

    pub fn extent(&self, name: &str) -> Option<(u32, u32)> {
        self.windows.get(name).map(|w| (w.width, w.height))
    }

    /// The raster most recently shown in an open window.
    pub fn shown(&self, name: &str) -> Option<&DynamicImage> {
        self.windows.get(name).and_then(|w| w.shown.as_ref())
    }

    pub fn events(&self) -> &[DisplayEvent] {
        &self.events
    }
}

impl DisplaySurface for RecordingDisplay {
    fn create_window(&mut self, name: &str, width: u32, height: u32) -> Result<()> {
        self.windows.insert(
            name.to_owned(),
            Window {
                width,
                height,
                shown: None,
            },
        );
        self.events.push(DisplayEvent::Created {
            name: name.to_owned(),
            width,
            height,
        });
        Ok(())
    }

    fn show(&mut self, name: &str, raster: &DynamicImage) -> Result<()> {
        let window = self
            .windows
            .get_mut(name)
            .ok_or_else(|| ViewerError::UnknownSurface(name.to_owned()))?;
        window.shown = Some(raster.clone());
        self.events.push(DisplayEvent::Shown {
            name: name.to_owned(),
        });
        Ok(())
    }

    fn destroy_window(&mut self, name: &str) -> Result<()> {
        self.windows
            .remove(name)
            .ok_or_else(|| ViewerError::UnknownSurface(name.to_owned()))?;
        self.events.push(DisplayEvent::Destroyed {
            name: name.to_owned(),
        });
        Ok(())
    }

    fn destroy_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.windows.keys().cloned().collect();
        for name in names {
            self.destroy_window(&name)?;
        }
        Ok(())
    }
}

/// Replays a fixed key sequence, then reports exhaustion.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    keys: VecDeque<Key>,
}

impl ScriptedInput {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll_key(&mut self, _timeout: Option<Duration>) -> Result<Option<Key>> {
        Ok(self.keys.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_memory_codec_missing_path_is_decode_failure() {
        let codec = MemoryCodec::new();
        let err = codec
            .decode(Path::new("img/001c.png"), ChannelMode::Color)
            .unwrap_err();
        assert!(matches!(err, ViewerError::DecodeFailure { .. }));
    }

    #[test]
    fn test_memory_codec_applies_channel_mode() {
        let mut codec = MemoryCodec::new();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([9])));
        codec.insert("img/001c.png", gray);
        let color = codec
            .decode(Path::new("img/001c.png"), ChannelMode::Color)
            .unwrap();
        assert_eq!(color.color().channel_count(), 3);
    }

    #[test]
    fn test_memory_codec_keeps_encoded_rasters() {
        let codec = MemoryCodec::new();
        let path = Path::new("out/meteorite.png");
        assert!(codec.encoded(path).is_none());
        let raster = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 1, Luma([42])));
        codec.encode(path, &raster).unwrap();
        assert_eq!(codec.encoded(path), Some(raster));
    }

    #[test]
    fn test_recording_display_tracks_windows() {
        let mut display = RecordingDisplay::new();
        let raster = DynamicImage::ImageLuma8(GrayImage::new(1, 1));
        display.create_window("a", 10, 20).unwrap();
        display.show("a", &raster).unwrap();
        assert_eq!(display.extent("a"), Some((10, 20)));
        assert_eq!(display.shown("a"), Some(&raster));
        assert!(display.show("b", &raster).is_err());

        display.destroy_all().unwrap();
        assert!(display.open_windows().is_empty());
        assert_eq!(
            display.events().last(),
            Some(&DisplayEvent::Destroyed { name: "a".into() })
        );
    }
}
