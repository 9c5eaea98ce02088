//! Run subdivision at a fixed spatial resolution.

use crate::classify::SurfaceKind;
use crate::gcode::{MotionRecord, Point3};

/// Planar lengths below this are treated as zero.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// A maximal contiguous sequence of same-classified extrusion moves
/// within one layer; the unit of subdivision and displacement.
#[derive(Debug, Clone)]
pub struct Run {
    /// Shared classification of every move in the run.
    pub kind: SurfaceKind,
    /// The moves, in document order.
    pub moves: Vec<MotionRecord>,
    /// Z height of the layer the run sits in.
    pub layer_z: f64,
}

impl Run {
    /// Create an empty run.
    pub fn new(kind: SurfaceKind, layer_z: f64) -> Self {
        Self {
            kind,
            moves: Vec::new(),
            layer_z,
        }
    }

    /// Total planar path length over all moves.
    pub fn planar_length(&self) -> f64 {
        self.moves.iter().map(|m| m.from.distance_xy(&m.to)).sum()
    }
}

/// One sub-segment of a subdivided run. Positions are planar: Z carries
/// the interpolated source height, not yet any displacement.
#[derive(Debug, Clone)]
pub struct SubSegment {
    /// Start vertex.
    pub start: Point3,
    /// End vertex.
    pub end: Point3,
    /// Planar length of this sub-segment.
    pub planar_len: f64,
    /// Planar-proportional share of the source move's extrusion.
    pub e: f64,
    /// Index into the run's moves of the originating move.
    pub source: usize,
}

/// Subdivide a run so no sub-segment is longer than `resolution`.
///
/// Each straight move is cut at `resolution` steps with the final
/// sub-segment absorbing the remainder, so the move's endpoint is
/// reproduced exactly and no drift accumulates. Moves shorter than
/// `resolution` stay whole; zero-length moves produce nothing.
pub fn subdivide(run: &Run, resolution: f64) -> Vec<SubSegment> {
    let mut subs = Vec::new();

    for (index, motion) in run.moves.iter().enumerate() {
        let length = motion.from.distance_xy(&motion.to);
        if length <= LENGTH_EPSILON {
            continue;
        }
        if length <= resolution + LENGTH_EPSILON {
            subs.push(SubSegment {
                start: motion.from,
                end: motion.to,
                planar_len: length,
                e: motion.e,
                source: index,
            });
            continue;
        }

        let mut cuts = Vec::new();
        let mut d = resolution;
        while d < length - LENGTH_EPSILON {
            cuts.push(d);
            d += resolution;
        }
        cuts.push(length);

        let mut prev_d = 0.0;
        let mut prev_point = motion.from;
        for cut in cuts {
            let point = motion.from.lerp(&motion.to, cut / length);
            subs.push(SubSegment {
                start: prev_point,
                end: point,
                planar_len: cut - prev_d,
                e: motion.e * (cut - prev_d) / length,
                source: index,
            });
            prev_d = cut;
            prev_point = point;
        }
    }

    subs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(from: Point3, to: Point3, e: f64) -> MotionRecord {
        MotionRecord {
            from,
            to,
            e,
            feed: None,
            line_index: 0,
            kind: SurfaceKind::Top,
        }
    }

    fn straight_run(length: f64, e: f64) -> Run {
        let mut run = Run::new(SurfaceKind::Top, 0.2);
        run.moves.push(record(
            Point3::new(0.0, 0.0, 0.2),
            Point3::new(length, 0.0, 0.2),
            e,
        ));
        run
    }

    #[test]
    fn test_exact_multiple_splits_evenly() {
        let run = straight_run(1.2, 0.4);
        let subs = subdivide(&run, 0.3);
        assert_eq!(subs.len(), 4);
        for sub in &subs {
            assert_relative_eq!(sub.planar_len, 0.3, epsilon = 1e-9);
            assert_relative_eq!(sub.e, 0.1, epsilon = 1e-9);
        }
        assert_relative_eq!(subs.last().unwrap().end.x, 1.2);
    }

    #[test]
    fn test_remainder_goes_to_final_sub_segment() {
        let run = straight_run(1.0, 1.0);
        let subs = subdivide(&run, 0.3);
        assert_eq!(subs.len(), 4);
        assert_relative_eq!(subs[0].planar_len, 0.3);
        assert_relative_eq!(subs[3].planar_len, 0.1, epsilon = 1e-9);
        // Endpoint reproduced exactly.
        assert_relative_eq!(subs[3].end.x, 1.0);
    }

    #[test]
    fn test_subdivision_is_lossless() {
        let mut run = Run::new(SurfaceKind::Top, 0.2);
        run.moves.push(record(
            Point3::new(0.0, 0.0, 0.2),
            Point3::new(2.0, 1.0, 0.2),
            0.5,
        ));
        run.moves.push(record(
            Point3::new(2.0, 1.0, 0.2),
            Point3::new(2.0, 4.7, 0.2),
            0.9,
        ));
        let subs = subdivide(&run, 0.25);
        let total: f64 = subs.iter().map(|s| s.planar_len).sum();
        assert_relative_eq!(total, run.planar_length(), epsilon = 1e-9);
        let total_e: f64 = subs.iter().map(|s| s.e).sum();
        assert_relative_eq!(total_e, 1.4, epsilon = 1e-9);
    }

    #[test]
    fn test_short_run_is_not_subdivided() {
        let run = straight_run(0.2, 0.05);
        let subs = subdivide(&run, 0.3);
        assert_eq!(subs.len(), 1);
        assert_relative_eq!(subs[0].planar_len, 0.2);
        assert_relative_eq!(subs[0].e, 0.05);
    }

    #[test]
    fn test_zero_length_move_is_dropped() {
        let run = straight_run(0.0, 0.05);
        assert!(subdivide(&run, 0.3).is_empty());
    }
}
