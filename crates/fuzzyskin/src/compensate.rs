//! Extrusion-length compensation.

/// Rescale a sub-segment's extrusion to match its true 3-D length.
///
/// `dz` is the height difference between the sub-segment's displaced
/// endpoints. Bridge segments deposit into free air, so their
/// compensation delta is scaled by `bridge_multiplier` before being
/// applied.
pub fn compensate(e: f64, planar_len: f64, dz: f64, bridge: bool, bridge_multiplier: f64) -> f64 {
    if planar_len <= f64::EPSILON {
        return e;
    }
    let factor = (planar_len * planar_len + dz * dz).sqrt() / planar_len;
    if bridge {
        e * (1.0 + (factor - 1.0) * bridge_multiplier)
    } else {
        e * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_segment_is_unchanged() {
        assert_relative_eq!(compensate(0.1, 0.3, 0.0, false, 3.0), 0.1);
    }

    #[test]
    fn test_matches_true_path_length() {
        // 3-4-5 triangle: planar 0.3, dz 0.4, true length 0.5.
        assert_relative_eq!(compensate(0.1, 0.3, 0.4, false, 3.0), 0.1 * (0.5 / 0.3));
    }

    #[test]
    fn test_monotonic_in_displacement() {
        let mut previous = 0.0;
        for step in 0..20 {
            let dz = f64::from(step) * 0.01;
            let e = compensate(0.1, 0.3, dz, false, 3.0);
            assert!(e >= previous, "compensation not monotonic at dz={dz}");
            previous = e;
        }
    }

    #[test]
    fn test_bridge_multiplier_scales_the_delta() {
        let plain = compensate(0.1, 0.3, 0.4, false, 3.0);
        let bridged = compensate(0.1, 0.3, 0.4, true, 3.0);
        let plain_delta = plain - 0.1;
        assert_relative_eq!(bridged - 0.1, plain_delta * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_multiplier_matches_plain() {
        assert_relative_eq!(
            compensate(0.1, 0.3, 0.4, true, 1.0),
            compensate(0.1, 0.3, 0.4, false, 1.0)
        );
    }

    #[test]
    fn test_degenerate_planar_length() {
        assert_relative_eq!(compensate(0.1, 0.0, 0.4, false, 3.0), 0.1);
    }
}
