//! Per-feature activation tables.

use std::collections::HashMap;
use std::fmt;

/// An optional processing overlay that can be toggled on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Threshold,
    Contour,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::Threshold, Feature::Contour];

    /// Title of the companion window showing this feature.
    pub fn window_title(self) -> &'static str {
        match self {
            Feature::Threshold => "Meteorite with Adaptive Thresholding",
            Feature::Contour => "Meteorite with Contour Detection",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Threshold => write!(f, "threshold"),
            Feature::Contour => write!(f, "contour"),
        }
    }
}

/// Typed identity of a display target.
///
/// Companion surfaces are namespaced by the feature they show, so two features
/// can never collide on the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    Primary,
    Companion(Feature),
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceId::Primary => write!(f, "primary"),
            SurfaceId::Companion(feature) => write!(f, "{feature}-companion"),
        }
    }
}

/// Activation table for one feature across all surfaces. Absent keys are
/// inactive.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    table: HashMap<SurfaceId, bool>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: SurfaceId) -> bool {
        self.table.get(&id).copied().unwrap_or(false)
    }

    pub fn set_active(&mut self, id: SurfaceId, value: bool) {
        self.table.insert(id, value);
    }
}

/// One registry per feature, owned together and handed to the controller.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    threshold: FeatureRegistry,
    contour: FeatureRegistry,
}

impl Registries {
    pub fn get(&self, feature: Feature) -> &FeatureRegistry {
        match feature {
            Feature::Threshold => &self.threshold,
            Feature::Contour => &self.contour,
        }
    }

    pub fn get_mut(&mut self, feature: Feature) -> &mut FeatureRegistry {
        match feature {
            Feature::Threshold => &mut self.threshold,
            Feature::Contour => &mut self.contour,
        }
    }
}
