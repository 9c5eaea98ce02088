//! G-code line parsing and carried-over motion state.
//!
//! The format permits omitting unchanged axes on a line, so parsing is
//! stateful: every move resolves against an explicit [`TrackedState`]
//! threaded through the document in order, never against hidden globals.

use crate::classify::SurfaceKind;
use crate::error::{FuzzyError, Result};

/// A point in machine coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar (XY) distance to another point.
    pub fn distance_xy(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` at parameter `t` in `[0, 1]`.
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        Point3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

/// Axis words present on a motion line, as written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisWords {
    /// X word.
    pub x: Option<f64>,
    /// Y word.
    pub y: Option<f64>,
    /// Z word.
    pub z: Option<f64>,
    /// E (extrusion) word.
    pub e: Option<f64>,
    /// F (feed rate) word.
    pub f: Option<f64>,
}

impl AxisWords {
    /// Does the line move in the XY plane?
    pub fn has_xy(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum GcodeLine {
    /// `G0`/`G1` linear move.
    Move(AxisWords),
    /// `G92` position register override.
    SetPosition(AxisWords),
    /// `G90` absolute axis positioning.
    AbsolutePositioning,
    /// `G91` relative axis positioning.
    RelativePositioning,
    /// `M82` absolute extrusion distances.
    AbsoluteExtrusion,
    /// `M83` relative extrusion distances.
    RelativeExtrusion,
    /// Anything else: comments, markers, other commands, blank lines.
    Passthrough,
}

/// Parse one raw line. `line` is the 1-based line number used in errors.
///
/// Only the motion vocabulary above is interpreted; every other line is a
/// [`GcodeLine::Passthrough`] and is preserved verbatim downstream. A
/// malformed numeric payload on a recognized motion word is fatal: partial
/// output would corrupt the toolpath.
pub fn parse_line(raw: &str, line: usize) -> Result<GcodeLine> {
    let code = match raw.find(';') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let mut tokens = code.split_whitespace();
    let command = match tokens.next() {
        Some(t) => t,
        None => return Ok(GcodeLine::Passthrough),
    };

    match command.to_ascii_uppercase().as_str() {
        "G0" | "G00" | "G1" | "G01" => Ok(GcodeLine::Move(parse_words(tokens, line)?)),
        "G92" => Ok(GcodeLine::SetPosition(parse_words(tokens, line)?)),
        "G90" => Ok(GcodeLine::AbsolutePositioning),
        "G91" => Ok(GcodeLine::RelativePositioning),
        "M82" => Ok(GcodeLine::AbsoluteExtrusion),
        "M83" => Ok(GcodeLine::RelativeExtrusion),
        _ => Ok(GcodeLine::Passthrough),
    }
}

fn parse_words<'a>(tokens: impl Iterator<Item = &'a str>, line: usize) -> Result<AxisWords> {
    let mut words = AxisWords::default();
    for token in tokens {
        let mut chars = token.chars();
        let letter = match chars.next() {
            Some(c) => c.to_ascii_uppercase(),
            None => continue,
        };
        let slot = match letter {
            'X' => &mut words.x,
            'Y' => &mut words.y,
            'Z' => &mut words.z,
            'E' => &mut words.e,
            'F' => &mut words.f,
            // Other words (S, T, ...) are not motion state; leave them to
            // the passthrough text.
            _ => continue,
        };
        let value: f64 = chars.as_str().parse().map_err(|_| FuzzyError::Parse {
            line,
            word: token.to_string(),
        })?;
        *slot = Some(value);
    }
    Ok(words)
}

/// A resolved linear move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Start of the move.
    pub from: Point3,
    /// End of the move.
    pub to: Point3,
    /// Material extruded over the move, as an incremental amount.
    pub e_delta: f64,
    /// Feed rate in effect for the move, if any is known.
    pub feed: Option<f64>,
}

/// A motion command tied back to its source line and surface class.
#[derive(Debug, Clone)]
pub struct MotionRecord {
    /// Start of the move.
    pub from: Point3,
    /// End of the move.
    pub to: Point3,
    /// Material extruded over the move, as an incremental amount.
    pub e: f64,
    /// Feed rate word on the line, if any.
    pub feed: Option<f64>,
    /// 0-based index of the originating line.
    pub line_index: usize,
    /// Surface classification tag.
    pub kind: SurfaceKind,
}

/// Carried-over motion state.
///
/// Tracks the last known position, extrusion register, feed rate, and the
/// active positioning/extrusion modes.
#[derive(Debug, Clone)]
pub struct TrackedState {
    /// Last known position.
    pub position: Point3,
    /// Last known extrusion register value.
    pub e: f64,
    /// Last known feed rate (mm/min).
    pub feed: Option<f64>,
    /// `G90` (true) vs `G91` axis interpretation.
    pub absolute_axes: bool,
    /// `M83` (true) vs `M82` extrusion interpretation.
    pub relative_e: bool,
}

impl Default for TrackedState {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            e: 0.0,
            feed: None,
            absolute_axes: true,
            relative_e: false,
        }
    }
}

impl TrackedState {
    /// Apply a mode-switch line.
    pub fn apply_mode(&mut self, line: &GcodeLine) {
        match line {
            GcodeLine::AbsolutePositioning => self.absolute_axes = true,
            GcodeLine::RelativePositioning => self.absolute_axes = false,
            GcodeLine::AbsoluteExtrusion => self.relative_e = false,
            GcodeLine::RelativeExtrusion => self.relative_e = true,
            _ => {}
        }
    }

    /// Apply a `G92` register override.
    pub fn apply_set_position(&mut self, words: &AxisWords) {
        if let Some(x) = words.x {
            self.position.x = x;
        }
        if let Some(y) = words.y {
            self.position.y = y;
        }
        if let Some(z) = words.z {
            self.position.z = z;
        }
        if let Some(e) = words.e {
            self.e = e;
        }
    }

    /// Resolve a move against the current state and advance it.
    ///
    /// Omitted axes inherit the previous position; the returned extrusion
    /// amount is always incremental regardless of the active mode.
    pub fn advance(&mut self, words: &AxisWords) -> Motion {
        let from = self.position;

        let to = if self.absolute_axes {
            Point3::new(
                words.x.unwrap_or(from.x),
                words.y.unwrap_or(from.y),
                words.z.unwrap_or(from.z),
            )
        } else {
            Point3::new(
                from.x + words.x.unwrap_or(0.0),
                from.y + words.y.unwrap_or(0.0),
                from.z + words.z.unwrap_or(0.0),
            )
        };

        let e_delta = match words.e {
            Some(e) if self.relative_e => e,
            Some(e) => {
                let delta = e - self.e;
                self.e = e;
                delta
            }
            None => 0.0,
        };

        if let Some(f) = words.f {
            self.feed = Some(f);
        }

        self.position = to;

        Motion {
            from,
            to,
            e_delta,
            feed: self.feed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_move_words() {
        let line = parse_line("G1 X10.5 Y-2 E0.0421 F3000", 1).unwrap();
        match line {
            GcodeLine::Move(w) => {
                assert_relative_eq!(w.x.unwrap(), 10.5);
                assert_relative_eq!(w.y.unwrap(), -2.0);
                assert_relative_eq!(w.e.unwrap(), 0.0421);
                assert_relative_eq!(w.f.unwrap(), 3000.0);
                assert!(w.z.is_none());
            }
            other => panic!("expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ignores_comments_and_unknown_commands() {
        assert_eq!(parse_line("; just a comment", 1).unwrap(), GcodeLine::Passthrough);
        assert_eq!(parse_line("", 1).unwrap(), GcodeLine::Passthrough);
        assert_eq!(parse_line("M104 S210", 1).unwrap(), GcodeLine::Passthrough);
        // Inline comment after the words.
        let line = parse_line("G1 X1 ; wipe", 1).unwrap();
        assert!(matches!(line, GcodeLine::Move(w) if w.x == Some(1.0)));
    }

    #[test]
    fn test_parse_malformed_word_is_fatal() {
        let err = parse_line("G1 X1 Ynope", 7).unwrap_err();
        match err {
            FuzzyError::Parse { line, word } => {
                assert_eq!(line, 7);
                assert_eq!(word, "Ynope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_carried_over_axes() {
        let mut state = TrackedState::default();
        state.advance(&AxisWords {
            x: Some(1.0),
            y: Some(2.0),
            z: Some(0.2),
            ..Default::default()
        });
        let motion = state.advance(&AxisWords {
            x: Some(5.0),
            e: Some(0.1),
            ..Default::default()
        });
        // Y and Z inherited from the previous move.
        assert_relative_eq!(motion.to.y, 2.0);
        assert_relative_eq!(motion.to.z, 0.2);
        assert_relative_eq!(motion.from.x, 1.0);
    }

    #[test]
    fn test_absolute_extrusion_deltas() {
        let mut state = TrackedState::default();
        assert!(!state.relative_e);
        let m1 = state.advance(&AxisWords {
            x: Some(1.0),
            e: Some(0.5),
            ..Default::default()
        });
        let m2 = state.advance(&AxisWords {
            x: Some(2.0),
            e: Some(0.8),
            ..Default::default()
        });
        assert_relative_eq!(m1.e_delta, 0.5);
        assert_relative_eq!(m2.e_delta, 0.3);

        // G92 E0 resets the register.
        state.apply_set_position(&AxisWords {
            e: Some(0.0),
            ..Default::default()
        });
        let m3 = state.advance(&AxisWords {
            x: Some(3.0),
            e: Some(0.2),
            ..Default::default()
        });
        assert_relative_eq!(m3.e_delta, 0.2);
    }

    #[test]
    fn test_relative_extrusion_deltas() {
        let mut state = TrackedState::default();
        state.apply_mode(&GcodeLine::RelativeExtrusion);
        let m = state.advance(&AxisWords {
            x: Some(1.0),
            e: Some(0.25),
            ..Default::default()
        });
        assert_relative_eq!(m.e_delta, 0.25);
    }

    #[test]
    fn test_relative_axes() {
        let mut state = TrackedState::default();
        state.advance(&AxisWords {
            x: Some(10.0),
            y: Some(10.0),
            ..Default::default()
        });
        state.apply_mode(&GcodeLine::RelativePositioning);
        let m = state.advance(&AxisWords {
            x: Some(-1.5),
            ..Default::default()
        });
        assert_relative_eq!(m.to.x, 8.5);
        assert_relative_eq!(m.to.y, 10.0);
    }
}
