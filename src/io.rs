//! Collaborators the viewer core calls into: image decode/encode, window
//! display, and key polling. Production implementations live here; in-memory
//! doubles live in [`crate::headless`].

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, trace};

use crate::error::{Result, ViewerError};

/// Channel layout requested from the codec at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Grayscale,
    Color,
}

impl ChannelMode {
    /// Converts a decoded raster to 8-bit luma or 8-bit RGB. Alpha is dropped.
    pub fn convert(self, image: DynamicImage) -> DynamicImage {
        match (self, image) {
            (ChannelMode::Grayscale, img @ DynamicImage::ImageLuma8(_)) => img,
            (ChannelMode::Color, img @ DynamicImage::ImageRgb8(_)) => img,
            (ChannelMode::Grayscale, img) => DynamicImage::ImageLuma8(img.to_luma8()),
            (ChannelMode::Color, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        }
    }
}

/// A key event as delivered by an [`InputSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Char(char),
}

impl Key {
    /// Left/right arrows arrive as 81/83 from X11 key polling;
    /// other codes are taken as characters.
    pub fn from_code(code: u32) -> Option<Key> {
        match code {
            81 => Some(Key::Left),
            83 => Some(Key::Right),
            other => char::from_u32(other).map(Key::Char),
        }
    }
}

pub trait ImageCodec {
    fn decode(&self, path: &Path, mode: ChannelMode) -> Result<DynamicImage>;
    fn encode(&self, path: &Path, raster: &DynamicImage) -> Result<()>;
}

/// Named display targets.
pub trait DisplaySurface {
    fn create_window(&mut self, name: &str, width: u32, height: u32) -> Result<()>;
    fn show(&mut self, name: &str, raster: &DynamicImage) -> Result<()>;
    fn destroy_window(&mut self, name: &str) -> Result<()>;
    fn destroy_all(&mut self) -> Result<()>;
}

pub trait InputSource {
    /// Waits for the next key. `None` as timeout blocks indefinitely.
    ///
    /// Returns `Ok(None)` when the timeout elapses or the source is exhausted.
    fn poll_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>>;
}

/// Reads and writes image files through the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCodec;

impl ImageCodec for FsCodec {
    fn decode(&self, path: &Path, mode: ChannelMode) -> Result<DynamicImage> {
        let image = image::open(path).map_err(|source| ViewerError::DecodeFailure {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded");
        Ok(mode.convert(image))
    }

    fn encode(&self, path: &Path, raster: &DynamicImage) -> Result<()> {
        raster
            .save(path)
            .map_err(|source| ViewerError::EncodeFailure {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Headless display backend: every `show` writes the window's contents to
/// `<dir>/<window-slug>.png`, scaled to the window's extents. Destroying a
/// window removes its snapshot.
#[derive(Debug)]
pub struct SnapshotDisplay<C = FsCodec> {
    dir: PathBuf,
    codec: C,
    windows: HashMap<String, (u32, u32)>,
}

impl SnapshotDisplay<FsCodec> {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_codec(dir, FsCodec)
    }
}

impl<C: ImageCodec> SnapshotDisplay<C> {
    pub fn with_codec(dir: impl Into<PathBuf>, codec: C) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            codec,
            windows: HashMap::new(),
        })
    }

    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", slug::slugify(name)))
    }

    fn remove_snapshot(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.snapshot_path(name)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl<C: ImageCodec> DisplaySurface for SnapshotDisplay<C> {
    fn create_window(&mut self, name: &str, width: u32, height: u32) -> Result<()> {
        self.windows.insert(name.to_owned(), (width, height));
        Ok(())
    }

    fn show(&mut self, name: &str, raster: &DynamicImage) -> Result<()> {
        let &(width, height) = self
            .windows
            .get(name)
            .ok_or_else(|| ViewerError::UnknownSurface(name.to_owned()))?;
        // Scaled for display only; the caller's buffer is untouched.
        let scaled = raster.resize_exact(width, height, FilterType::Triangle);
        let path = self.snapshot_path(name);
        self.codec.encode(&path, &scaled)?;
        trace!(window = name, path = %path.display(), "snapshot written");
        Ok(())
    }

    fn destroy_window(&mut self, name: &str) -> Result<()> {
        if self.windows.remove(name).is_none() {
            return Err(ViewerError::UnknownSurface(name.to_owned()));
        }
        self.remove_snapshot(name)
    }

    fn destroy_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.windows.drain().map(|(name, _)| name).collect();
        for name in names {
            self.remove_snapshot(&name)?;
        }
        Ok(())
    }
}

/// Key tokens read line by line from any buffered reader.
///
/// Tokens are whitespace separated: `left`, `right`, a numeric key code, or a
/// single character. Unrecognised tokens are skipped. End of input reads as `q`
/// so a script always terminates the viewer.
pub struct LineInput<R> {
    reader: R,
    pending: VecDeque<Key>,
    exhausted: bool,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    fn parse_token(token: &str) -> Option<Key> {
        match token {
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            _ => {
                if let Ok(code) = token.parse::<u32>()
                    && token.len() > 1
                {
                    return Key::from_code(code);
                }
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    // Line-oriented input has no way to time out, so every poll blocks.
    fn poll_key(&mut self, _timeout: Option<Duration>) -> Result<Option<Key>> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                return Ok(Some(key));
            }
            if self.exhausted {
                return Ok(None);
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                self.exhausted = true;
                return Ok(Some(Key::Char('q')));
            }
            for token in line.split_whitespace() {
                match Self::parse_token(token) {
                    Some(key) => self.pending.push_back(key),
                    None => debug!(token, "ignoring unrecognised key token"),
                }
            }
        }
    }
}
