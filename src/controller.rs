//! The feature-toggle state machine and the event loop that feeds it.
//!
//! Each `(feature, surface)` pair is either inactive or active. Toggling an
//! inactive feature opens a companion surface showing the processed source for
//! the primary surface's current image; toggling it again closes that surface.
//! Navigation only moves the primary surface, so open companions keep showing
//! the image they were built from until toggled again.

use std::collections::HashMap;
use std::io::Write;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::command::{CONTROLS, Command, classify};
use crate::contours::{ContourStyle, apply_contours};
use crate::error::{Result, ViewerError};
use crate::io::{DisplaySurface, ImageCodec, InputSource};
use crate::path::ImagePathResolver;
use crate::registry::{Feature, Registries, SurfaceId};
use crate::surface::{Extent, Surface};
use crate::threshold::{ThresholdParams, apply_threshold};

#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub resolver: ImagePathResolver,
    /// Inclusive bounds of the image sequence.
    pub first_index: u32,
    pub last_index: u32,
    pub extent: Extent,
    pub primary_title: String,
    pub threshold: ThresholdParams,
    pub contour: ContourStyle,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            resolver: ImagePathResolver::default(),
            first_index: 1,
            last_index: 7,
            extent: Extent::default(),
            primary_title: "Meteorite".to_owned(),
            threshold: ThresholdParams::default(),
            contour: ContourStyle::default(),
        }
    }
}

impl ViewerSettings {
    pub fn check_index(&self, index: u32) -> Result<()> {
        if (self.first_index..=self.last_index).contains(&index) {
            Ok(())
        } else {
            Err(ViewerError::InvalidIndex {
                index,
                first: self.first_index,
                last: self.last_index,
            })
        }
    }
}

/// What the event loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    ShowMenu,
    Quit,
}

pub struct ToggleController<C, D> {
    settings: ViewerSettings,
    registries: Registries,
    codec: C,
    display: D,
    primary: Surface,
    companions: HashMap<Feature, Surface>,
}

/// Signed step from `from` to `to`, or `IndexOverflow` if it does not fit a
/// single navigation.
fn delta_between(from: u32, to: u32) -> Result<i32> {
    let delta = i64::from(to) - i64::from(from);
    i32::try_from(delta).map_err(|_| ViewerError::IndexOverflow { index: from, delta })
}

impl<C: ImageCodec, D: DisplaySurface> ToggleController<C, D> {
    /// Opens the primary surface on `start_index`.
    pub fn new(
        settings: ViewerSettings,
        registries: Registries,
        codec: C,
        mut display: D,
        start_index: u32,
    ) -> Result<Self> {
        settings.check_index(start_index)?;
        let primary = Surface::create(
            SurfaceId::Primary,
            settings.primary_title.clone(),
            start_index,
            settings.extent,
            &settings.resolver,
            &codec,
            &mut display,
        )?;
        Ok(Self {
            settings,
            registries,
            codec,
            display,
            primary,
            companions: HashMap::new(),
        })
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn primary(&self) -> &Surface {
        &self.primary
    }

    pub fn companion(&self, feature: Feature) -> Option<&Surface> {
        self.companions.get(&feature)
    }

    /// Whether `feature` is currently drawn on its companion surface.
    pub fn is_active(&self, feature: Feature) -> bool {
        self.registries
            .get(feature)
            .is_active(SurfaceId::Companion(feature))
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Flow> {
        debug!(?command, "dispatch");
        match command {
            Command::Previous => {
                self.previous()?;
            }
            Command::Next => {
                self.next()?;
            }
            Command::Toggle(feature) => {
                self.toggle(feature)?;
            }
            Command::Menu => return Ok(Flow::ShowMenu),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Steps back one image. A no-op on the first image; returns whether it moved.
    pub fn previous(&mut self) -> Result<bool> {
        if self.primary.index() <= self.settings.first_index {
            debug!(index = self.primary.index(), "already at first image");
            return Ok(false);
        }
        self.step(-1)?;
        Ok(true)
    }

    /// Steps forward one image. A no-op on the last image; returns whether it moved.
    pub fn next(&mut self) -> Result<bool> {
        if self.primary.index() >= self.settings.last_index {
            debug!(index = self.primary.index(), "already at last image");
            return Ok(false);
        }
        self.step(1)?;
        Ok(true)
    }

    /// Jumps the primary surface straight to `index`.
    pub fn navigate_to(&mut self, index: u32) -> Result<()> {
        self.settings.check_index(index)?;
        let delta = delta_between(self.primary.index(), index)?;
        self.step(delta)
    }

    fn step(&mut self, delta: i32) -> Result<()> {
        let index = self.primary.navigate(
            delta,
            &self.settings.resolver,
            &self.codec,
            &mut self.display,
        )?;
        info!(index, "showing image");
        Ok(())
    }

    /// Flips `feature` and returns its new state.
    pub fn toggle(&mut self, feature: Feature) -> Result<bool> {
        if self.is_active(feature) {
            self.toggle_off(feature)?;
            Ok(false)
        } else {
            self.toggle_on(feature)?;
            Ok(true)
        }
    }

    fn toggle_on(&mut self, feature: Feature) -> Result<()> {
        let id = SurfaceId::Companion(feature);
        let index = self.primary.index();

        // A companion left over from a failed toggle is reloaded, not reopened.
        let mut companion = match self.companions.remove(&feature) {
            Some(mut existing) => {
                let reloaded = delta_between(existing.index(), index).and_then(|delta| {
                    existing.navigate(
                        delta,
                        &self.settings.resolver,
                        &self.codec,
                        &mut self.display,
                    )
                });
                if let Err(err) = reloaded {
                    self.companions.insert(feature, existing);
                    return Err(err);
                }
                existing
            }
            None => Surface::create(
                id,
                feature.window_title(),
                index,
                self.settings.extent,
                &self.settings.resolver,
                &self.codec,
                &mut self.display,
            )?,
        };

        let processed = match feature {
            Feature::Threshold => Ok(DynamicImage::ImageLuma8(apply_threshold(
                companion.buffer(),
                &self.settings.threshold,
            ))),
            Feature::Contour => apply_contours(
                companion.buffer(),
                &self.settings.threshold,
                &self.settings.contour,
            )
            .map(DynamicImage::ImageRgb8),
        };
        let shown =
            processed.and_then(|buffer| companion.replace_buffer(buffer, &mut self.display));
        self.companions.insert(feature, companion);
        shown?;

        self.registries.get_mut(feature).set_active(id, true);
        info!(%feature, index, "feature on");
        Ok(())
    }

    fn toggle_off(&mut self, feature: Feature) -> Result<()> {
        let closed = match self.companions.remove(&feature) {
            Some(companion) => companion.close(&mut self.display),
            None => Ok(()),
        };
        self.registries
            .get_mut(feature)
            .set_active(SurfaceId::Companion(feature), false);
        info!(%feature, "feature off");
        closed
    }

    /// Destroys every surface and hands back the display.
    pub fn shutdown(mut self) -> Result<D> {
        for feature in self.companions.keys().copied().collect::<Vec<_>>() {
            self.registries
                .get_mut(feature)
                .set_active(SurfaceId::Companion(feature), false);
        }
        self.companions.clear();
        self.display.destroy_all()?;
        info!("all surfaces destroyed");
        Ok(self.display)
    }
}

/// Runs the blocking event loop until a quit command or the end of input.
///
/// A command that fails is logged and skipped; only quitting ends the loop.
pub fn run<C, D, I, W>(
    mut controller: ToggleController<C, D>,
    input: &mut I,
    out: &mut W,
) -> Result<D>
where
    C: ImageCodec,
    D: DisplaySurface,
    I: InputSource + ?Sized,
    W: Write,
{
    writeln!(out, "{CONTROLS}")?;
    loop {
        let Some(key) = input.poll_key(None)? else {
            info!("input closed");
            break;
        };
        let Some(command) = classify(key) else {
            debug!(?key, "unbound key");
            continue;
        };
        match controller.dispatch(command) {
            Ok(Flow::Continue) => {}
            Ok(Flow::ShowMenu) => writeln!(out, "{CONTROLS}")?,
            Ok(Flow::Quit) => break,
            Err(err) => warn!(?command, error = %err, "command aborted"),
        }
    }
    let display = controller.shutdown()?;
    writeln!(out, "Quitting...")?;
    Ok(display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{MemoryCodec, RecordingDisplay, ScriptedInput};
    use crate::io::Key;
    use crate::threshold::{BACKGROUND, FOREGROUND};
    use image::{Rgb, RgbImage};

    const THRESHOLD_TITLE: &str = "Meteorite with Adaptive Thresholding";
    const CONTOUR_TITLE: &str = "Meteorite with Contour Detection";

    /// Light field with a dark square whose offset depends on `index`.
    fn specimen(index: u32) -> DynamicImage {
        let offset = 4 + index;
        DynamicImage::ImageRgb8(RgbImage::from_fn(32, 24, |x, y| {
            if (offset..offset + 10).contains(&x) && (6..16).contains(&y) {
                Rgb([40, 30, 20])
            } else {
                Rgb([220, 210, 200])
            }
        }))
    }

    fn settings() -> ViewerSettings {
        ViewerSettings {
            extent: Extent {
                width: 64,
                height: 48,
            },
            threshold: ThresholdParams {
                median_kernel: 3,
                ..ThresholdParams::default()
            },
            ..ViewerSettings::default()
        }
    }

    fn codec(missing: &[u32]) -> MemoryCodec {
        let resolver = ImagePathResolver::default();
        let mut codec = MemoryCodec::new();
        for i in 1..=7 {
            if !missing.contains(&i) {
                codec.insert(resolver.resolve(i), specimen(i));
            }
        }
        codec
    }

    fn controller(missing: &[u32]) -> ToggleController<MemoryCodec, RecordingDisplay> {
        ToggleController::new(
            settings(),
            Registries::default(),
            codec(missing),
            RecordingDisplay::new(),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_start_outside_range_is_invalid() {
        for start in [0, 8] {
            let result = ToggleController::new(
                settings(),
                Registries::default(),
                codec(&[]),
                RecordingDisplay::new(),
                start,
            );
            assert!(matches!(result, Err(ViewerError::InvalidIndex { .. })));
        }
    }

    #[test]
    fn test_navigation_bounds_are_no_ops() {
        let mut viewer = controller(&[]);
        let events = viewer.display().events().len();
        assert!(!viewer.previous().unwrap());
        assert_eq!(viewer.primary().index(), 1);
        assert_eq!(viewer.display().events().len(), events);

        let last = viewer.settings().last_index;
        viewer.navigate_to(last).unwrap();
        let events = viewer.display().events().len();
        assert!(!viewer.next().unwrap());
        assert_eq!(viewer.primary().index(), 7);
        assert_eq!(viewer.display().events().len(), events);

        assert!(matches!(
            viewer.navigate_to(8),
            Err(ViewerError::InvalidIndex {
                index: 8,
                first: 1,
                last: 7
            })
        ));
    }

    #[test]
    fn test_delta_between_reports_overflow() {
        assert_eq!(delta_between(1, 4).unwrap(), 3);
        assert_eq!(delta_between(4, 1).unwrap(), -3);
        match delta_between(0, u32::MAX) {
            Err(ViewerError::IndexOverflow { index, delta }) => {
                assert_eq!(index, 0);
                assert_eq!(delta, i64::from(u32::MAX));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_threshold_toggle_round_trip() {
        let mut viewer = controller(&[]);
        assert!(!viewer.is_active(Feature::Threshold));

        assert!(viewer.toggle(Feature::Threshold).unwrap());
        assert!(viewer.is_active(Feature::Threshold));
        let shown = viewer.display().shown(THRESHOLD_TITLE).unwrap();
        assert_eq!(shown.color().channel_count(), 1);
        assert_eq!((shown.width(), shown.height()), (32, 24));
        assert!(
            shown
                .to_luma8()
                .pixels()
                .all(|p| p[0] == FOREGROUND || p[0] == BACKGROUND)
        );
        assert_eq!(viewer.display().extent(THRESHOLD_TITLE), Some((64, 48)));

        assert!(!viewer.toggle(Feature::Threshold).unwrap());
        assert!(!viewer.is_active(Feature::Threshold));
        assert!(!viewer.display().is_open(THRESHOLD_TITLE));
        assert!(viewer.companion(Feature::Threshold).is_none());

        assert!(viewer.toggle(Feature::Threshold).unwrap());
        assert!(viewer.is_active(Feature::Threshold));
    }

    #[test]
    fn test_features_toggle_independently() {
        let mut viewer = controller(&[]);
        viewer.toggle(Feature::Contour).unwrap();
        assert!(viewer.is_active(Feature::Contour));
        assert!(!viewer.is_active(Feature::Threshold));

        let shown = viewer.display().shown(CONTOUR_TITLE).unwrap();
        assert_eq!(shown.color().channel_count(), 3);
        assert_eq!((shown.width(), shown.height()), (32, 24));

        viewer.toggle(Feature::Threshold).unwrap();
        viewer.toggle(Feature::Contour).unwrap();
        assert!(!viewer.is_active(Feature::Contour));
        assert!(viewer.is_active(Feature::Threshold));
        assert!(viewer.display().is_open(THRESHOLD_TITLE));
        assert!(!viewer.display().is_open(CONTOUR_TITLE));
    }

    #[test]
    fn test_companion_stays_stale_on_navigation() {
        let mut viewer = controller(&[]);
        viewer.toggle(Feature::Threshold).unwrap();
        let before = viewer.display().shown(THRESHOLD_TITLE).cloned();

        viewer.next().unwrap();
        assert_eq!(viewer.primary().index(), 2);
        assert_eq!(viewer.companion(Feature::Threshold).unwrap().index(), 1);
        assert_eq!(viewer.display().shown(THRESHOLD_TITLE).cloned(), before);
    }

    #[test]
    fn test_failed_navigation_keeps_index() {
        let mut viewer = controller(&[3]);
        viewer.next().unwrap();
        assert!(matches!(
            viewer.next(),
            Err(ViewerError::DecodeFailure { .. })
        ));
        assert_eq!(viewer.primary().index(), 2);
        assert_eq!(viewer.display().shown("Meteorite"), Some(&specimen(2)));
    }

    #[test]
    fn test_failed_toggle_leaves_feature_inactive() {
        let mut viewer = controller(&[]);
        viewer.navigate_to(3).unwrap();
        // The file behind the current image disappears.
        viewer.codec = codec(&[3]);

        assert!(viewer.toggle(Feature::Contour).is_err());
        assert!(!viewer.is_active(Feature::Contour));
        assert!(!viewer.display().is_open(CONTOUR_TITLE));
        assert!(viewer.companion(Feature::Contour).is_none());
    }

    #[test]
    fn test_run_recovers_from_errors_and_quits() {
        let viewer = controller(&[2]);
        let mut input = ScriptedInput::new([
            Key::Right,
            Key::Char('x'),
            Key::Char('t'),
            Key::Char('m'),
            Key::Char('q'),
            Key::Char('t'),
        ]);
        let mut out = Vec::new();
        let display = run(viewer, &mut input, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Controls:").count(), 2);
        assert!(text.ends_with("Quitting...\n"));
        assert!(display.open_windows().is_empty());
        // The key after `q` is never read.
        assert_eq!(input.poll_key(None).unwrap(), Some(Key::Char('t')));
    }

    #[test]
    fn test_run_ends_when_input_is_exhausted() {
        let viewer = controller(&[]);
        let mut input = ScriptedInput::new([Key::Char('c')]);
        let mut out = Vec::new();
        let display = run(viewer, &mut input, &mut out).unwrap();
        assert!(display.open_windows().is_empty());
    }
}
