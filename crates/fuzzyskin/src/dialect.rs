//! Slicer dialect detection and marker vocabularies.
//!
//! The three supported slicers word the same semantic markers differently.
//! Everything dialect-specific is resolved here; downstream components see
//! one internal taxonomy.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The slicer that generated a G-code document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlicerDialect {
    /// PrusaSlicer.
    #[default]
    PrusaSlicer,
    /// OrcaSlicer.
    OrcaSlicer,
    /// Bambu Studio.
    BambuStudio,
}

impl SlicerDialect {
    /// Identify the generating slicer from the document header.
    pub fn detect(lines: &[&str]) -> Option<Self> {
        for line in lines.iter().take(10) {
            if line.contains("PrusaSlicer") {
                return Some(SlicerDialect::PrusaSlicer);
            } else if line.contains("OrcaSlicer") {
                return Some(SlicerDialect::OrcaSlicer);
            } else if line.contains("BambuStudio") {
                return Some(SlicerDialect::BambuStudio);
            }
        }
        None
    }

    /// Resolve the marker vocabulary for a document.
    ///
    /// OrcaSlicer configured for the `marlin` flavor emits Bambu-style
    /// markers, so that combination maps to [`SlicerDialect::BambuStudio`].
    /// An unidentified header falls back to PrusaSlicer markers.
    pub fn resolve(lines: &[&str]) -> Self {
        match Self::detect(lines) {
            Some(SlicerDialect::OrcaSlicer) if gcode_flavor(lines).as_deref() == Some("marlin") => {
                SlicerDialect::BambuStudio
            }
            Some(dialect) => dialect,
            None => SlicerDialect::PrusaSlicer,
        }
    }

    /// Comment prefix introducing a surface-type change.
    pub fn type_prefix(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer | SlicerDialect::OrcaSlicer => ";TYPE:",
            SlicerDialect::BambuStudio => "; FEATURE:",
        }
    }

    /// Marker opening a top solid surface.
    pub fn top_surface_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => ";TYPE:Top solid infill",
            SlicerDialect::OrcaSlicer => ";TYPE:Top surface",
            SlicerDialect::BambuStudio => "; FEATURE: Top surface",
        }
    }

    /// Marker opening bridge infill.
    pub fn bridge_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => ";TYPE:Bridge infill",
            SlicerDialect::OrcaSlicer => ";TYPE:Bridge",
            SlicerDialect::BambuStudio => "; FEATURE: Bridge",
        }
    }

    /// Marker opening an overhang perimeter.
    pub fn overhang_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => ";TYPE:Overhang perimeter",
            SlicerDialect::OrcaSlicer => ";TYPE:Overhang wall",
            SlicerDialect::BambuStudio => "; FEATURE: Overhang wall",
        }
    }

    /// Layer-change marker.
    pub fn layer_marker(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer | SlicerDialect::OrcaSlicer => ";LAYER_CHANGE",
            SlicerDialect::BambuStudio => "; CHANGE_LAYER",
        }
    }

    /// Settings-comment key enabling the slicer's native fuzzy skin.
    pub fn fuzzy_skin_key(&self) -> &'static str {
        "; fuzzy_skin ="
    }

    /// Values of [`Self::fuzzy_skin_key`] that mean "enabled".
    pub fn fuzzy_skin_values(&self) -> &'static [&'static str] {
        match self {
            SlicerDialect::PrusaSlicer => &["external", "all"],
            SlicerDialect::OrcaSlicer | SlicerDialect::BambuStudio => {
                &["allwalls", "external", "all"]
            }
        }
    }

    /// Settings-comment key for the fuzzy point spacing.
    pub fn point_dist_key(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer | SlicerDialect::BambuStudio => "; fuzzy_skin_point_dist =",
            SlicerDialect::OrcaSlicer => "; fuzzy_skin_point_distance =",
        }
    }

    /// Settings-comment key for the fuzzy thickness.
    pub fn thickness_key(&self) -> &'static str {
        "; fuzzy_skin_thickness ="
    }

    /// Settings-comment key for the support contact distance.
    pub fn support_contact_key(&self) -> &'static str {
        match self {
            SlicerDialect::PrusaSlicer => "; support_material_contact_distance",
            SlicerDialect::OrcaSlicer => "; support_bottom_z_distance",
            SlicerDialect::BambuStudio => "; support_top_z_distance",
        }
    }
}

fn gcode_flavor(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| line.starts_with("; gcode_flavor ="))
        .map(|line| line.rsplit('=').next().unwrap_or("").trim().to_string())
}

/// Settings the slicer embedded in the document as comments.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmbeddedSettings {
    /// The slicer's own fuzzy-skin feature is enabled.
    pub fuzzy_skin_enabled: bool,
    /// `fuzzy_skin_point_dist` value.
    pub point_dist: Option<f64>,
    /// `fuzzy_skin_thickness` value.
    pub thickness: Option<f64>,
    /// Vertical clearance the slicer keeps between supports and the model.
    pub support_contact_distance: Option<f64>,
}

/// Scan a document for embedded fuzzy-skin settings.
///
/// Slicers append the settings block at the end of the file, so the scan
/// walks backwards and stops at the first hit per key.
pub fn scan_settings(lines: &[&str], dialect: SlicerDialect) -> EmbeddedSettings {
    let mut settings = EmbeddedSettings::default();

    for line in lines.iter().rev() {
        if line.starts_with(dialect.fuzzy_skin_key()) {
            let value = trailing_value(line).to_ascii_lowercase();
            settings.fuzzy_skin_enabled = dialect.fuzzy_skin_values().contains(&value.as_str());
            break;
        }
    }

    if settings.fuzzy_skin_enabled {
        for line in lines.iter().rev() {
            if line.starts_with(dialect.point_dist_key()) {
                settings.point_dist = parse_trailing_value(line, "fuzzy skin point distance");
            } else if line.starts_with(dialect.thickness_key()) {
                settings.thickness = parse_trailing_value(line, "fuzzy skin thickness");
            }
            if settings.point_dist.is_some() && settings.thickness.is_some() {
                break;
            }
        }
    }

    for line in lines.iter().rev() {
        if line.starts_with(dialect.support_contact_key()) {
            settings.support_contact_distance = parse_trailing_value(line, "support contact distance");
            break;
        }
    }

    settings
}

fn trailing_value(line: &str) -> &str {
    line.rsplit('=').next().unwrap_or("").trim()
}

fn parse_trailing_value(line: &str, what: &str) -> Option<f64> {
    match trailing_value(line).parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparsable {what}: {}", line.trim());
            None
        }
    }
}
