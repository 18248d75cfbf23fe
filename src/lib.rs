//! Interactive viewer for a numbered image sequence with toggleable
//! adaptive-threshold and contour overlays.
//!
//! The core is [`controller::ToggleController`], a per-feature state machine
//! driven by classified [`command::Command`]s. Image decoding, window display
//! and key input are collaborators behind the traits in [`io`], so the viewer
//! runs headless against [`headless`] doubles.

mod colors;
pub mod command;
pub mod config;
pub mod contours;
pub mod controller;
pub mod error;
pub mod headless;
pub mod io;
pub mod path;
pub mod registry;
pub mod surface;
pub mod threshold;

pub use command::{Command, classify};
pub use config::Config;
pub use controller::{Flow, ToggleController, ViewerSettings, run};
pub use error::{Result, ViewerError};
pub use path::{Background, ImagePathResolver};
pub use registry::{Feature, FeatureRegistry, Registries, SurfaceId};
pub use surface::{Extent, Surface};
