//! Painted-stroke masks for paint-on fuzzing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};

/// User-painted strokes selecting where fuzzing applies, independent of
/// slicer-native surface detection.
///
/// A stroke is an open polyline in the XY plane. A point is covered when
/// it lies within the stroke width of a candidate point placed along the
/// stroke at the configured sample spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaintMask {
    strokes: Vec<Vec<[f64; 2]>>,
}

impl PaintMask {
    /// Create a mask from stroke polylines.
    pub fn new(strokes: Vec<Vec<[f64; 2]>>) -> Self {
        Self { strokes }
    }

    /// Load a mask from a JSON file: an array of strokes, each an array
    /// of `[x, y]` points.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FuzzyError::MaskLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| FuzzyError::MaskLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Number of strokes.
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Is the mask empty?
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Is `(x, y)` within `thickness` of any stroke, with stroke points
    /// sampled every `point_dist`?
    pub fn covers(&self, x: f64, y: f64, thickness: f64, point_dist: f64) -> bool {
        let limit_sq = thickness * thickness;
        let near = |px: f64, py: f64| {
            let dx = px - x;
            let dy = py - y;
            dx * dx + dy * dy <= limit_sq
        };

        for stroke in &self.strokes {
            if let [only] = stroke.as_slice() {
                if near(only[0], only[1]) {
                    return true;
                }
            }
            for pair in stroke.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let dx = b[0] - a[0];
                let dy = b[1] - a[1];
                let length = (dx * dx + dy * dy).sqrt();
                let steps = ((length / point_dist).ceil() as usize).max(1);
                for i in 0..=steps {
                    let t = i as f64 / steps as f64;
                    if near(a[0] + dx * t, a[1] + dy * t) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_near_stroke() {
        let mask = PaintMask::new(vec![vec![[0.0, 0.0], [10.0, 0.0]]]);
        assert!(mask.covers(5.0, 0.2, 0.3, 0.3));
        assert!(mask.covers(0.0, 0.0, 0.3, 0.3));
        assert!(!mask.covers(5.0, 1.0, 0.3, 0.3));
        assert!(!mask.covers(12.0, 0.0, 0.3, 0.3));
    }

    #[test]
    fn test_single_point_stroke() {
        let mask = PaintMask::new(vec![vec![[1.0, 1.0]]]);
        assert!(mask.covers(1.1, 1.0, 0.2, 0.3));
        assert!(!mask.covers(2.0, 1.0, 0.2, 0.3));
    }

    #[test]
    fn test_sample_spacing_respects_point_dist() {
        // A coarse spacing leaves gaps between candidate points.
        let mask = PaintMask::new(vec![vec![[0.0, 0.0], [10.0, 0.0]]]);
        assert!(mask.covers(5.0, 0.0, 0.05, 0.1));
        // Midway between two samples spaced 5mm apart, 2.4mm off axis:
        // more than 0.05 from every candidate.
        assert!(!mask.covers(2.5, 2.4, 0.05, 5.0));
    }

    #[test]
    fn test_json_round_trip() {
        let mask = PaintMask::new(vec![vec![[0.0, 0.0], [1.0, 2.0]], vec![[3.0, 4.0]]]);
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, "[[[0.0,0.0],[1.0,2.0]],[[3.0,4.0]]]");
        let back: PaintMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);
    }
}
