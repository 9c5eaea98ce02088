//! Surface classification of motion records.
//!
//! Dialect markers are normalized here into one internal taxonomy; every
//! component downstream of the classifier is dialect-agnostic.

use tracing::debug;

use crate::dialect::SlicerDialect;
use crate::gcode::Point3;
use crate::paint::PaintMask;

/// Surface class of a motion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceKind {
    /// Not part of any qualifying surface; passes through untouched.
    #[default]
    Unclassified,
    /// Top solid surface, fuzzed upward.
    Top,
    /// Bridge infill under an overhang, fuzzed downward.
    Bridge,
    /// Inside a user-painted stroke region.
    Painted,
    /// Would qualify, but a toggle or the support clearance rules it out.
    Excluded,
}

impl SurfaceKind {
    /// Does this class receive the fuzzy transformation?
    pub fn qualifies(&self) -> bool {
        matches!(self, SurfaceKind::Top | SurfaceKind::Bridge | SurfaceKind::Painted)
    }
}

/// Streaming classifier driven by dialect markers.
///
/// Consumes passthrough lines in document order via [`Classifier::observe`]
/// and answers classification queries for the extrusion moves between them.
#[derive(Debug)]
pub struct Classifier {
    dialect: SlicerDialect,
    top_enabled: bool,
    lower_enabled: bool,
    min_support_distance: f64,
    support_clearance: Option<f64>,
    in_top: bool,
    in_bridge: bool,
    overhang_in_layer: bool,
    in_fuzzy_section: bool,
    section_markers_seen: bool,
}

/// Marker toggling painted sections on, emitted by paint-on tooling.
pub const FUZZY_SECTION_START: &str = ";FuzzySectionStart";
/// Marker toggling painted sections off.
pub const FUZZY_SECTION_END: &str = ";FuzzySectionEnd";

impl Classifier {
    /// Create a classifier for one document.
    ///
    /// `support_clearance` is the vertical distance the slicer keeps
    /// between support interfaces and the model; `None` means no supports
    /// exist, which is treated as infinite clearance.
    pub fn new(
        dialect: SlicerDialect,
        top_enabled: bool,
        lower_enabled: bool,
        min_support_distance: f64,
        support_clearance: Option<f64>,
    ) -> Self {
        Self {
            dialect,
            top_enabled,
            lower_enabled,
            min_support_distance,
            support_clearance,
            in_top: false,
            in_bridge: false,
            overhang_in_layer: false,
            in_fuzzy_section: false,
            section_markers_seen: false,
        }
    }

    /// Digest a passthrough line; dialect markers update section state.
    ///
    /// Unrecognized markers change nothing: they degrade to unclassified
    /// passthrough rather than failing.
    pub fn observe(&mut self, raw: &str) {
        let trimmed = raw.trim_end();
        if trimmed.starts_with(FUZZY_SECTION_START) {
            self.in_fuzzy_section = true;
            self.section_markers_seen = true;
        } else if trimmed.starts_with(FUZZY_SECTION_END) {
            self.in_fuzzy_section = false;
            self.section_markers_seen = true;
        } else if trimmed.starts_with(self.dialect.layer_marker()) {
            self.overhang_in_layer = false;
            self.in_top = false;
            self.in_bridge = false;
        } else if trimmed.starts_with(self.dialect.top_surface_marker()) {
            self.in_top = true;
            self.in_bridge = false;
        } else if trimmed.starts_with(self.dialect.bridge_marker()) {
            self.in_bridge = true;
            self.in_top = false;
        } else if trimmed.starts_with(self.dialect.overhang_marker()) {
            self.overhang_in_layer = true;
            self.in_top = false;
            self.in_bridge = false;
        } else if trimmed.starts_with(self.dialect.type_prefix()) {
            self.in_top = false;
            self.in_bridge = false;
        }
    }

    /// Is a paint-on fuzzy section currently open?
    pub fn in_fuzzy_section(&self) -> bool {
        self.in_fuzzy_section
    }

    /// True while the current section boundary marks the end of a run.
    fn gated_off(&self) -> bool {
        self.section_markers_seen && !self.in_fuzzy_section
    }

    /// Classify an extrusion move using the dialect's surface markers.
    pub fn classify_markers(&self) -> SurfaceKind {
        if self.gated_off() {
            return SurfaceKind::Unclassified;
        }
        if self.in_top {
            return if self.top_enabled {
                SurfaceKind::Top
            } else {
                SurfaceKind::Excluded
            };
        }
        // Bridges only qualify under an overhang in the same layer;
        // freestanding bridge infill behaves differently and is left alone.
        if self.in_bridge && self.overhang_in_layer {
            if !self.lower_enabled {
                return SurfaceKind::Excluded;
            }
            let clearance = self.support_clearance.unwrap_or(f64::INFINITY);
            if clearance < self.min_support_distance {
                debug!(
                    clearance,
                    min = self.min_support_distance,
                    "bridge run too close to support interface, excluding"
                );
                return SurfaceKind::Excluded;
            }
            return SurfaceKind::Bridge;
        }
        SurfaceKind::Unclassified
    }

    /// Classify an extrusion move by painted-stroke containment.
    pub fn classify_paint(
        &self,
        mask: &PaintMask,
        thickness: f64,
        point_dist: f64,
        from: &Point3,
        to: &Point3,
    ) -> SurfaceKind {
        if self.gated_off() {
            return SurfaceKind::Unclassified;
        }
        if mask.covers(to.x, to.y, thickness, point_dist)
            || mask.covers(from.x, from.y, thickness, point_dist)
        {
            SurfaceKind::Painted
        } else {
            SurfaceKind::Unclassified
        }
    }

    /// Vertical clearance to the nearest support interface.
    pub fn support_clearance(&self) -> f64 {
        self.support_clearance.unwrap_or(f64::INFINITY)
    }
}
