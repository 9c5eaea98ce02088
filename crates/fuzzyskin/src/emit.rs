//! Serialization of transformed motion.
//!
//! Sub-segment lines are formatted the way the slicers themselves write
//! motion: four decimal places on axes, five on extrusion. The emitter
//! also keeps the extrusion register consistent when the document uses
//! absolute extrusion distances.

/// Formats transformed motion lines and accounts for the E register.
#[derive(Debug)]
pub struct Emitter {
    relative_e: bool,
    register: f64,
    emitted_motion: bool,
}

impl Emitter {
    /// Create an emitter for one run.
    ///
    /// `register` is the extrusion register value at the start of the run;
    /// it is only consulted in absolute-extrusion documents.
    pub fn new(relative_e: bool, register: f64) -> Self {
        Self {
            relative_e,
            register,
            emitted_motion: false,
        }
    }

    /// Format a motion line depositing `e_delta` while moving to the
    /// given position.
    pub fn motion_line(&mut self, x: f64, y: f64, z: f64, e_delta: f64) -> String {
        self.emitted_motion = true;
        let e = if self.relative_e {
            e_delta
        } else {
            self.register += e_delta;
            self.register
        };
        format!("G1 X{x:.4} Y{y:.4} Z{z:.4} E{e:.5}")
    }

    /// Format a travel line lifting to a displaced starting height.
    pub fn lift_line(z: f64) -> String {
        format!("G1 Z{z:.4}")
    }

    /// Format a feed-rate change.
    pub fn feed_line(feed: f64) -> String {
        format!("G1 F{feed}")
    }

    /// Retain a replaced source line as a trailing comment.
    pub fn comment_line(original: &str) -> String {
        format!("; {}", original.trim())
    }

    /// Restore the extrusion register to the source document's value.
    ///
    /// Compensation changes the deposited total, so in absolute mode the
    /// register must be reset or every untouched downstream `E` word
    /// would deposit the difference again. Relative documents need no
    /// restore.
    pub fn restore_line(&self, source_register: f64) -> Option<String> {
        if self.relative_e || !self.emitted_motion {
            None
        } else {
            Some(format!("G92 E{source_register:.5}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_lines_carry_deltas() {
        let mut emitter = Emitter::new(true, 0.0);
        assert_eq!(
            emitter.motion_line(1.0, 2.0, 0.2, 0.0123),
            "G1 X1.0000 Y2.0000 Z0.2000 E0.01230"
        );
        assert_eq!(
            emitter.motion_line(1.5, 2.0, 0.2, 0.02),
            "G1 X1.5000 Y2.0000 Z0.2000 E0.02000"
        );
        assert!(emitter.restore_line(0.0).is_none());
    }

    #[test]
    fn test_absolute_lines_accumulate() {
        let mut emitter = Emitter::new(false, 1.0);
        assert_eq!(
            emitter.motion_line(1.0, 0.0, 0.2, 0.25),
            "G1 X1.0000 Y0.0000 Z0.2000 E1.25000"
        );
        assert_eq!(
            emitter.motion_line(2.0, 0.0, 0.2, 0.25),
            "G1 X2.0000 Y0.0000 Z0.2000 E1.50000"
        );
        assert_eq!(emitter.restore_line(1.4).unwrap(), "G92 E1.40000");
    }

    #[test]
    fn test_no_restore_without_motion() {
        let emitter = Emitter::new(false, 1.0);
        assert!(emitter.restore_line(1.0).is_none());
    }

    #[test]
    fn test_feed_and_comment_formatting() {
        assert_eq!(Emitter::feed_line(9000.0), "G1 F9000");
        assert_eq!(Emitter::feed_line(4512.5), "G1 F4512.5");
        assert_eq!(Emitter::lift_line(10.1234567), "G1 Z10.1235");
        assert_eq!(
            Emitter::comment_line("G1 X1 Y2 E0.5 \r"),
            "; G1 X1 Y2 E0.5"
        );
    }
}
