//! Single-pass streaming transformation driver.
//!
//! Raw lines stream through the parser and classifier; qualifying runs
//! are buffered, subdivided, displaced, compensated, and re-emitted in
//! place, while every other line bypasses straight to the output in
//! document order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::classify::{Classifier, SurfaceKind};
use crate::compensate::compensate;
use crate::dialect::{scan_settings, SlicerDialect};
use crate::displace::{Bounds, DisplacementField};
use crate::emit::Emitter;
use crate::error::{FuzzyError, Result};
use crate::gcode::{parse_line, GcodeLine, Motion, MotionRecord, TrackedState};
use crate::map::DisplacementMap;
use crate::paint::PaintMask;
use crate::segment::{subdivide, Run, LENGTH_EPSILON};
use crate::FuzzySettings;

/// Transform a G-code document.
///
/// Loads the displacement source named by the settings, then runs the
/// engine. The returned string is the complete transformed document;
/// nothing is written anywhere on error.
pub fn fuzzify(input: &str, settings: &FuzzySettings) -> Result<String> {
    let field = build_field(input, settings)?;
    let mut rng = StdRng::from_entropy();
    fuzzify_with(input, settings, field, &mut rng)
}

/// Transform a G-code document with an explicit displacement field and
/// random source. This is the deterministic entry point: seed the RNG to
/// reproduce a transformation exactly.
pub fn fuzzify_with<R: Rng>(
    input: &str,
    settings: &FuzzySettings,
    field: DisplacementField,
    rng: &mut R,
) -> Result<String> {
    settings.validate()?;
    if !settings.run {
        info!("fuzzy skin disabled, passing the document through");
        return Ok(input.to_string());
    }

    let lines: Vec<&str> = input.split('\n').collect();
    let dialect = settings
        .dialect
        .unwrap_or_else(|| SlicerDialect::resolve(&lines));
    let embedded = scan_settings(&lines, dialect);
    let support_clearance = settings
        .support_clearance
        .or(embedded.support_contact_distance);
    info!(
        ?dialect,
        mode = field_label(&field),
        resolution = settings.resolution,
        "transforming document"
    );

    let classifier = Classifier::new(
        dialect,
        settings.top_surface,
        settings.lower_surface,
        settings.min_support_distance,
        support_clearance,
    );

    let mut engine = Engine {
        settings,
        field,
        classifier,
        state: TrackedState::default(),
        rng,
        out: Vec::with_capacity(lines.len()),
        buffer: None,
    };

    for (idx, raw) in lines.iter().enumerate() {
        engine.step(idx, raw)?;
    }
    engine.flush();

    Ok(engine.out.join("\n"))
}

/// Resolve the displacement source named by the settings.
pub fn build_field(input: &str, settings: &FuzzySettings) -> Result<DisplacementField> {
    if let Some(path) = &settings.displacement_map {
        let map = DisplacementMap::load(path)?;
        let lines: Vec<&str> = input.split('\n').collect();
        let bounds = scan_bounds(&lines)?;
        Ok(DisplacementField::Map { map, bounds })
    } else if let Some(path) = &settings.paint_mask {
        Ok(DisplacementField::Paint(PaintMask::load(path)?))
    } else {
        Ok(DisplacementField::Random)
    }
}

/// Planar extent of every extrusion move in the document.
fn scan_bounds(lines: &[&str]) -> Result<Bounds> {
    let mut state = TrackedState::default();
    let mut bounds = Bounds::empty();
    for (idx, raw) in lines.iter().enumerate() {
        match parse_line(raw, idx + 1)? {
            GcodeLine::Move(words) => {
                let motion = state.advance(&words);
                if words.has_xy() && motion.e_delta > 0.0 {
                    bounds.expand(motion.from.x, motion.from.y);
                    bounds.expand(motion.to.x, motion.to.y);
                }
            }
            GcodeLine::SetPosition(words) => state.apply_set_position(&words),
            other => state.apply_mode(&other),
        }
    }
    if !bounds.is_valid() {
        return Err(FuzzyError::InvalidSettings(
            "document has no planar extrusion motion to address the displacement map".into(),
        ));
    }
    Ok(bounds)
}

fn field_label(field: &DisplacementField) -> &'static str {
    match field {
        DisplacementField::Random => "random",
        DisplacementField::Paint(_) => "paint",
        DisplacementField::Map { .. } => "map",
    }
}

/// A qualifying run being collected, plus what is needed to replay it
/// verbatim if it turns out untransformable.
struct RunBuffer {
    run: Run,
    raws: Vec<String>,
    start_e: f64,
}

struct Engine<'a, R: Rng> {
    settings: &'a FuzzySettings,
    field: DisplacementField,
    classifier: Classifier,
    state: TrackedState,
    rng: &'a mut R,
    out: Vec<String>,
    buffer: Option<RunBuffer>,
}

impl<R: Rng> Engine<'_, R> {
    fn step(&mut self, idx: usize, raw: &str) -> Result<()> {
        match parse_line(raw, idx + 1)? {
            GcodeLine::Move(words) => {
                let e_before = self.state.e;
                let motion = self.state.advance(&words);
                let extruding = words.has_xy()
                    && motion.e_delta > 0.0
                    && motion.from.distance_xy(&motion.to) > LENGTH_EPSILON;
                if !extruding {
                    // Travel, Z hop, or retraction: ends any open run.
                    self.flush();
                    self.out.push(raw.to_string());
                    return Ok(());
                }

                let kind = self.classify(&motion);
                if !kind.qualifies() {
                    self.flush();
                    self.out.push(raw.to_string());
                    return Ok(());
                }

                let record = MotionRecord {
                    from: motion.from,
                    to: motion.to,
                    e: motion.e_delta,
                    feed: words.f,
                    line_index: idx,
                    kind,
                };
                match &mut self.buffer {
                    Some(buf) if buf.run.kind == kind => {
                        buf.run.moves.push(record);
                        buf.raws.push(raw.to_string());
                    }
                    _ => {
                        self.flush();
                        let mut run = Run::new(kind, motion.from.z);
                        run.moves.push(record);
                        self.buffer = Some(RunBuffer {
                            run,
                            raws: vec![raw.to_string()],
                            start_e: e_before,
                        });
                    }
                }
            }
            GcodeLine::SetPosition(words) => {
                self.flush();
                self.state.apply_set_position(&words);
                self.out.push(raw.to_string());
            }
            GcodeLine::Passthrough => {
                self.flush();
                self.classifier.observe(raw);
                self.out.push(raw.to_string());
            }
            mode => {
                self.flush();
                self.state.apply_mode(&mode);
                self.out.push(raw.to_string());
            }
        }
        Ok(())
    }

    fn classify(&self, motion: &Motion) -> SurfaceKind {
        if let DisplacementField::Paint(mask) = &self.field {
            self.classifier.classify_paint(
                mask,
                self.settings.xy_thickness,
                self.settings.xy_point_dist,
                &motion.from,
                &motion.to,
            )
        } else {
            self.classifier.classify_markers()
        }
    }

    /// Transform and emit the buffered run, if any.
    fn flush(&mut self) {
        let Some(buf) = self.buffer.take() else {
            return;
        };

        let subs = subdivide(&buf.run, self.settings.resolution);
        if subs.is_empty() {
            // Nothing safely transformable: replay the source verbatim.
            self.out.extend(buf.raws);
            return;
        }

        let n = subs.len();
        let bridge = buf.run.kind == SurfaceKind::Bridge;
        let clearance = self.classifier.support_clearance();

        let mut planar = Vec::with_capacity(n + 1);
        let mut heights = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let p = if i == 0 { subs[0].start } else { subs[i - 1].end };
            // A vertex the source path already had, as opposed to one
            // created by subdivision.
            let boundary = i == 0 || i == n || subs[i - 1].source != subs[i].source;
            let offset = self.vertex_offset(p.x, p.y, boundary, bridge, clearance);
            let mut z = p.z + offset;
            if !bridge {
                // Never dip below the layer plane on supported surfaces.
                z = z.max(buf.run.layer_z);
            }
            planar.push(p.z);
            heights.push(z);
        }

        // Oversize resolution and an all-zero field leave the run
        // untouched; keep the source bytes in that case.
        let unchanged = self.settings.fuzzy_speed.is_none()
            && n == buf.run.moves.len()
            && heights
                .iter()
                .zip(planar.iter())
                .all(|(h, z)| (h - z).abs() <= LENGTH_EPSILON);
        if unchanged {
            self.out.extend(buf.raws);
            return;
        }

        let mut emitter = Emitter::new(self.state.relative_e, buf.start_e);
        if let Some(speed) = self.settings.fuzzy_speed {
            self.out.push(Emitter::feed_line(speed));
        }
        if (heights[0] - planar[0]).abs() > LENGTH_EPSILON {
            self.out.push(Emitter::lift_line(heights[0]));
        }

        let mut i = 0;
        while i < n {
            let source = subs[i].source;
            if self.settings.fuzzy_speed.is_none() {
                if let Some(feed) = buf.run.moves[source].feed {
                    self.out.push(Emitter::feed_line(feed));
                }
            }
            while i < n && subs[i].source == source {
                let sub = &subs[i];
                let dz = heights[i + 1] - heights[i];
                let e = if self.settings.compensate_extrusion {
                    compensate(
                        sub.e,
                        sub.planar_len,
                        dz,
                        bridge,
                        self.settings.bridge_compensation_multiplier,
                    )
                } else {
                    sub.e
                };
                self.out
                    .push(emitter.motion_line(sub.end.x, sub.end.y, heights[i + 1], e));
                i += 1;
            }
            self.out.push(Emitter::comment_line(&buf.raws[source]));
        }

        if self.settings.fuzzy_speed.is_some() {
            if let Some(feed) = self.state.feed {
                self.out.push(Emitter::feed_line(feed));
            }
        }
        if let Some(line) = emitter.restore_line(self.state.e) {
            self.out.push(line);
        }

        debug!(
            kind = ?buf.run.kind,
            moves = buf.run.moves.len(),
            sub_segments = n,
            "transformed run"
        );
    }

    fn vertex_offset(&mut self, x: f64, y: f64, boundary: bool, bridge: bool, clearance: f64) -> f64 {
        // Vertices the path already had stay on the surface plane while
        // connect-walls is on, so consecutive loops meet without a seam.
        if boundary && self.settings.connect_walls {
            return 0.0;
        }
        if bridge {
            self.field
                .bridge_offset(x, y, self.settings, clearance, self.rng)
        } else {
            self.field.offset(x, y, self.settings, self.rng)
        }
    }
}
