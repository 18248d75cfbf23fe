use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{Result, ViewerError};
use crate::io::{ChannelMode, DisplaySurface, ImageCodec};
use crate::path::ImagePathResolver;
use crate::registry::SurfaceId;

/// Sources are always decoded in color so contour overlays never meet a
/// single-channel buffer.
pub const SOURCE_MODE: ChannelMode = ChannelMode::Color;

/// Requested window extents. The raster is scaled to these for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 800,
        }
    }
}

/// One named display target and the raster it owns.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    title: String,
    index: u32,
    buffer: DynamicImage,
    extent: Extent,
}

impl Surface {
    /// Decodes the image at `index`, opens a window sized to `extent` and shows it.
    pub fn create(
        id: SurfaceId,
        title: impl Into<String>,
        index: u32,
        extent: Extent,
        resolver: &ImagePathResolver,
        codec: &dyn ImageCodec,
        display: &mut dyn DisplaySurface,
    ) -> Result<Self> {
        let title = title.into();
        let buffer = codec.decode(&resolver.resolve(index), SOURCE_MODE)?;
        display.create_window(&title, extent.width, extent.height)?;
        display.show(&title, &buffer)?;
        info!(surface = %id, title = %title, index, "surface created");
        Ok(Self {
            id,
            title,
            index,
            buffer,
            extent,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn buffer(&self) -> &DynamicImage {
        &self.buffer
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Moves `delta` images along the sequence and shows the new image.
    ///
    /// Range policy belongs to the caller. The new image is decoded before
    /// anything changes, so a failed decode leaves index, buffer and window as
    /// they were.
    pub fn navigate(
        &mut self,
        delta: i32,
        resolver: &ImagePathResolver,
        codec: &dyn ImageCodec,
        display: &mut dyn DisplaySurface,
    ) -> Result<u32> {
        let index = self
            .index
            .checked_add_signed(delta)
            .ok_or(ViewerError::IndexOverflow {
                index: self.index,
                delta: i64::from(delta),
            })?;
        let buffer = codec.decode(&resolver.resolve(index), SOURCE_MODE)?;
        display.show(&self.title, &buffer)?;
        self.index = index;
        self.buffer = buffer;
        debug!(surface = %self.id, index, "navigated");
        Ok(index)
    }

    /// Replaces the owned raster with processed output and shows it. The
    /// previous pixels are dropped.
    pub fn replace_buffer(
        &mut self,
        buffer: DynamicImage,
        display: &mut dyn DisplaySurface,
    ) -> Result<()> {
        display.show(&self.title, &buffer)?;
        self.buffer = buffer;
        Ok(())
    }

    /// Disposes of the window. The surface is consumed.
    pub fn close(self, display: &mut dyn DisplaySurface) -> Result<()> {
        display.destroy_window(&self.title)?;
        info!(surface = %self.id, title = %self.title, "surface closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{DisplayEvent, MemoryCodec, RecordingDisplay};
    use image::{Rgb, RgbImage};

    fn solid(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([value, value, value])))
    }

    fn codec_with(indices: &[u32]) -> (ImagePathResolver, MemoryCodec) {
        let resolver = ImagePathResolver::default();
        let mut codec = MemoryCodec::new();
        for &i in indices {
            codec.insert(resolver.resolve(i), solid(i as u8 * 10));
        }
        (resolver, codec)
    }

    #[test]
    fn test_create_shows_decoded_image() {
        let (resolver, codec) = codec_with(&[1]);
        let mut display = RecordingDisplay::new();
        let surface = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            1,
            Extent::default(),
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap();

        assert_eq!(surface.id(), SurfaceId::Primary);
        assert_eq!(surface.title(), "Meteorite");
        assert_eq!(surface.extent(), Extent::default());
        assert_eq!(surface.index(), 1);
        assert_eq!(surface.buffer(), &solid(10));
        assert_eq!(display.extent("Meteorite"), Some((1000, 800)));
        assert_eq!(display.shown("Meteorite"), Some(&solid(10)));
    }

    #[test]
    fn test_create_missing_image_opens_nothing() {
        let (resolver, codec) = codec_with(&[]);
        let mut display = RecordingDisplay::new();
        let err = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            3,
            Extent::default(),
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap_err();
        match err {
            ViewerError::DecodeFailure { path, .. } => assert_eq!(path, resolver.resolve(3)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(display.events().is_empty());
    }

    #[test]
    fn test_navigate_reloads_and_redisplays() {
        let (resolver, codec) = codec_with(&[1, 2]);
        let mut display = RecordingDisplay::new();
        let mut surface = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            1,
            Extent::default(),
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap();

        assert_eq!(surface.navigate(1, &resolver, &codec, &mut display).unwrap(), 2);
        assert_eq!(surface.buffer(), &solid(20));
        assert_eq!(display.shown("Meteorite"), Some(&solid(20)));

        assert_eq!(surface.navigate(-1, &resolver, &codec, &mut display).unwrap(), 1);
        assert_eq!(surface.buffer(), &solid(10));
    }

    #[test]
    fn test_failed_navigate_keeps_prior_state() {
        let (resolver, codec) = codec_with(&[1]);
        let mut display = RecordingDisplay::new();
        let mut surface = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            1,
            Extent::default(),
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap();
        let events_before = display.events().len();

        assert!(surface.navigate(1, &resolver, &codec, &mut display).is_err());
        assert_eq!(surface.index(), 1);
        assert_eq!(surface.buffer(), &solid(10));
        assert_eq!(display.events().len(), events_before);
    }

    #[test]
    fn test_navigate_below_zero_is_overflow() {
        let (resolver, codec) = codec_with(&[1]);
        let mut display = RecordingDisplay::new();
        let mut surface = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            1,
            Extent::default(),
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap();

        match surface.navigate(-2, &resolver, &codec, &mut display) {
            Err(ViewerError::IndexOverflow { index, delta }) => {
                assert_eq!(index, 1);
                assert_eq!(delta, -2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(surface.index(), 1);
        assert_eq!(surface.buffer(), &solid(10));
    }

    #[test]
    fn test_close_destroys_window() {
        let (resolver, codec) = codec_with(&[1]);
        let mut display = RecordingDisplay::new();
        let surface = Surface::create(
            SurfaceId::Primary,
            "Meteorite",
            1,
            Extent { width: 10, height: 8 },
            &resolver,
            &codec,
            &mut display,
        )
        .unwrap();
        surface.close(&mut display).unwrap();
        assert!(!display.is_open("Meteorite"));
        assert_eq!(
            display.events().last(),
            Some(&DisplayEvent::Destroyed {
                name: "Meteorite".into()
            })
        );
    }
}
