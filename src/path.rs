//! Maps image sequence numbers to file paths.
//!
//! Files are named `<3-digit zero-padded index><background letter>.<ext>`, for
//! example `img/005c.png`. Indices of 100 and above are written unpadded.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Background the dataset images were rendered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Background {
    #[serde(rename = "b")]
    Black,
    /// Transparent background.
    #[default]
    #[serde(rename = "c")]
    Clear,
    #[serde(rename = "w")]
    White,
}

impl Background {
    pub fn letter(self) -> char {
        match self {
            Background::Black => 'b',
            Background::Clear => 'c',
            Background::White => 'w',
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Pure string computation from an index to the image it names. No I/O is
/// performed, so a path is produced even when no file backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePathResolver {
    dir: String,
    background: Background,
    extension: String,
}

impl Default for ImagePathResolver {
    fn default() -> Self {
        Self::new("img", Background::Clear, "png")
    }
}

impl ImagePathResolver {
    pub fn new(dir: impl Into<String>, background: Background, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            background,
            extension: extension.into(),
        }
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn resolve(&self, index: u32) -> PathBuf {
        let name = format!("{:0>3}{}.{}", index, self.background, self.extension);
        PathBuf::from(&self.dir).join(name)
    }
}
