//! Per-vertex displacement generation.
//!
//! Exactly one displacement source is active per engine run. All three
//! share the same query shape: given a vertex's planar position, produce
//! a signed Z offset within the configured bounds.

use rand::Rng;

use crate::map::DisplacementMap;
use crate::paint::PaintMask;
use crate::FuzzySettings;

/// Planar extent of all extrusion motion in a document; used to address
/// the displacement map by position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest X seen.
    pub min_x: f64,
    /// Smallest Y seen.
    pub min_y: f64,
    /// Largest X seen.
    pub max_x: f64,
    /// Largest Y seen.
    pub max_y: f64,
}

impl Bounds {
    /// An empty extent that any real point will expand.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Grow to include `(x, y)`.
    pub fn expand(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Does the extent span a nonzero area in both axes?
    pub fn is_valid(&self) -> bool {
        self.max_x > self.min_x && self.max_y > self.min_y
    }

    /// Map `(x, y)` into normalized `[0, 1]` coordinates.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.min_x) / (self.max_x - self.min_x),
            (y - self.min_y) / (self.max_y - self.min_y),
        )
    }
}

/// The displacement source active for one engine run.
#[derive(Debug)]
pub enum DisplacementField {
    /// Independent uniform draws in `[z_min, z_max]`.
    Random,
    /// Nonzero only inside painted strokes; random magnitude there.
    Paint(PaintMask),
    /// Sampled from a displacement image addressed by the print's extent.
    Map {
        /// The decoded image.
        map: DisplacementMap,
        /// Planar extent of the document's extrusion motion.
        bounds: Bounds,
    },
}

impl DisplacementField {
    /// Offset for a surface vertex at `(x, y)`, in `[z_min, z_max]`.
    ///
    /// Paint mode returns exactly zero outside the painted strokes.
    pub fn offset<R: Rng>(&self, x: f64, y: f64, settings: &FuzzySettings, rng: &mut R) -> f64 {
        match self {
            DisplacementField::Random => uniform(rng, settings.z_min, settings.z_max),
            DisplacementField::Paint(mask) => {
                if mask.covers(x, y, settings.xy_thickness, settings.xy_point_dist) {
                    uniform(rng, settings.z_min, settings.z_max)
                } else {
                    0.0
                }
            }
            DisplacementField::Map { map, bounds } => {
                let (u, v) = bounds.normalize(x, y);
                settings.z_min + map.sample(u, v) * (settings.z_max - settings.z_min)
            }
        }
    }

    /// Offset for a bridge vertex at `(x, y)`.
    ///
    /// Bridges fuzz downward into free air; the magnitude is capped by
    /// the support clearance minus the configured minimum, so the texture
    /// never reaches the support interface below.
    pub fn bridge_offset<R: Rng>(
        &self,
        x: f64,
        y: f64,
        settings: &FuzzySettings,
        clearance: f64,
        rng: &mut R,
    ) -> f64 {
        let max_down = settings
            .z_max
            .min(clearance - settings.min_support_distance)
            .max(0.0);
        match self {
            DisplacementField::Random => -uniform(rng, 0.0, max_down),
            DisplacementField::Paint(mask) => {
                if mask.covers(x, y, settings.xy_thickness, settings.xy_point_dist) {
                    -uniform(rng, 0.0, max_down)
                } else {
                    0.0
                }
            }
            DisplacementField::Map { map, bounds } => {
                let (u, v) = bounds.normalize(x, y);
                -(map.sample(u, v) * max_down)
            }
        }
    }
}

fn uniform<R: Rng>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high - low <= f64::EPSILON {
        low
    } else {
        rng.gen_range(low..high)
    }
}
