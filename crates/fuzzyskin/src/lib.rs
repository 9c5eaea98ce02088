#![warn(missing_docs)]

//! Fuzzy-skin post-processing for sliced G-code.
//!
//! This crate rewrites a sliced toolpath so that flat top surfaces,
//! bridged undersides, or user-painted regions come out textured: each
//! qualifying straight move is subdivided and every subdivision vertex is
//! displaced out of plane by a bounded random or pattern-driven amount,
//! with the deposited material rescaled to the true path length. All
//! other lines pass through byte-for-byte.
//!
//! PrusaSlicer, OrcaSlicer, and Bambu Studio output is recognized; the
//! surface markers each slicer embeds are normalized internally, so the
//! transformation itself is dialect-agnostic.
//!
//! # Example
//!
//! ```ignore
//! use fuzzyskin::{fuzzify, FuzzySettings};
//!
//! let input = std::fs::read_to_string("model.gcode")?;
//! let settings = FuzzySettings {
//!     z_max: 0.4,
//!     ..Default::default()
//! };
//! let output = fuzzify(&input, &settings)?;
//! std::fs::write("model.gcode", output)?;
//! ```

pub mod classify;
pub mod compensate;
pub mod dialect;
pub mod displace;
pub mod emit;
pub mod error;
pub mod gcode;
pub mod map;
pub mod paint;
pub mod process;
pub mod segment;

pub use classify::{Classifier, SurfaceKind};
pub use dialect::{scan_settings, EmbeddedSettings, SlicerDialect};
pub use displace::{Bounds, DisplacementField};
pub use error::{FuzzyError, Result};
pub use gcode::{MotionRecord, Point3, TrackedState};
pub use map::DisplacementMap;
pub use paint::PaintMask;
pub use process::{build_field, fuzzify, fuzzify_with};
pub use segment::{subdivide, Run, SubSegment};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine parameters, resolved once before processing and read-only
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzySettings {
    /// Spatial subdivision step along qualifying paths (mm).
    pub resolution: f64,
    /// Lower displacement bound (mm, signed).
    pub z_min: f64,
    /// Upper displacement bound (mm, signed).
    pub z_max: f64,
    /// Keep pre-existing path vertices on the surface plane so
    /// consecutive wall loops connect without a seam.
    pub connect_walls: bool,
    /// Master switch; when false the document passes through untouched.
    pub run: bool,
    /// Rescale extrusion to the true 3-D sub-segment length.
    pub compensate_extrusion: bool,
    /// Fuzz top solid surfaces.
    pub top_surface: bool,
    /// Fuzz bridged undersides.
    pub lower_surface: bool,
    /// Feed-rate override for fuzzy sections (mm/min).
    pub fuzzy_speed: Option<f64>,
    /// Minimum vertical clearance to a support interface below a bridge
    /// before it may be fuzzed (mm).
    pub min_support_distance: f64,
    /// Scale applied to the extrusion-compensation delta on bridges.
    pub bridge_compensation_multiplier: f64,
    /// Painted stroke width (mm).
    pub xy_thickness: f64,
    /// Sample spacing along painted strokes (mm).
    pub xy_point_dist: f64,
    /// Vertical clearance the slicer keeps between supports and the
    /// model; `None` reads it from the document, falling back to
    /// "no supports present".
    pub support_clearance: Option<f64>,
    /// Marker vocabulary override; `None` detects it from the header.
    pub dialect: Option<SlicerDialect>,
    /// Displacement image driving pattern mode.
    pub displacement_map: Option<PathBuf>,
    /// Stroke file driving paint-on mode.
    pub paint_mask: Option<PathBuf>,
}

impl Default for FuzzySettings {
    fn default() -> Self {
        Self {
            resolution: 0.3,
            z_min: 0.0,
            z_max: 0.3,
            connect_walls: true,
            run: true,
            compensate_extrusion: true,
            top_surface: true,
            lower_surface: true,
            fuzzy_speed: None,
            min_support_distance: 0.1,
            bridge_compensation_multiplier: 3.0,
            xy_thickness: 0.3,
            xy_point_dist: 0.3,
            support_clearance: None,
            dialect: None,
            displacement_map: None,
            paint_mask: None,
        }
    }
}

impl FuzzySettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.resolution <= 0.0 {
            return Err(FuzzyError::InvalidSettings(
                "resolution must be positive".into(),
            ));
        }
        if self.z_min > self.z_max {
            return Err(FuzzyError::InvalidSettings(
                "z_min must not exceed z_max".into(),
            ));
        }
        if self.xy_thickness <= 0.0 || self.xy_point_dist <= 0.0 {
            return Err(FuzzyError::InvalidSettings(
                "paint stroke width and spacing must be positive".into(),
            ));
        }
        if self.min_support_distance < 0.0 {
            return Err(FuzzyError::InvalidSettings(
                "min_support_distance must not be negative".into(),
            ));
        }
        if self.bridge_compensation_multiplier < 0.0 {
            return Err(FuzzyError::InvalidSettings(
                "bridge_compensation_multiplier must not be negative".into(),
            ));
        }
        if matches!(self.fuzzy_speed, Some(speed) if speed <= 0.0) {
            return Err(FuzzyError::InvalidSettings(
                "fuzzy_speed must be positive".into(),
            ));
        }
        if self.displacement_map.is_some() && self.paint_mask.is_some() {
            return Err(FuzzyError::InvalidSettings(
                "displacement map and paint mask are mutually exclusive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(FuzzySettings::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = FuzzySettings {
            resolution: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = FuzzySettings {
            z_min: 0.5,
            z_max: 0.1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = FuzzySettings {
            fuzzy_speed: Some(-100.0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = FuzzySettings {
            displacement_map: Some("pattern.png".into()),
            paint_mask: Some("mask.json".into()),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
