use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

/// Errors raised by the viewer core and its collaborators.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The image at `path` could not be read or decoded.
    #[error("failed to decode {}", path.display())]
    DecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A raster could not be written to `path`.
    #[error("failed to encode {}", path.display())]
    EncodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A requested image index lies outside the dataset.
    #[error("image index {index} is outside {first}..={last}")]
    InvalidIndex { index: u32, first: u32, last: u32 },

    /// Moving `delta` images from `index` does not land on a representable index.
    #[error("cannot move {delta} image(s) from index {index}")]
    IndexOverflow { index: u32, delta: i64 },

    /// A color overlay was requested on a buffer that is not three-channel.
    #[error("expected a 3-channel buffer, got {channels} channel(s)")]
    ChannelMismatch { channels: u8 },

    /// The display was asked about a window it never created.
    #[error("unknown surface {0:?}")]
    UnknownSurface(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
