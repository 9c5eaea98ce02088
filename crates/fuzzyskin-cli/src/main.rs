//! fuzzyskin CLI - fuzzy-skin G-code post-processor
//!
//! Designed to sit in a slicer's post-processing hook: point PrusaSlicer,
//! OrcaSlicer, or Bambu Studio at the binary and it rewrites the exported
//! G-code in place. Explicit flags override whatever fuzzy-skin settings
//! the slicer embedded in the file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fuzzyskin::{fuzzify, scan_settings, FuzzySettings, SlicerDialect};

#[derive(Parser)]
#[command(name = "fuzzyskin")]
#[command(about = "Add fuzzy skin to sliced G-code", long_about = None)]
struct Cli {
    /// Path to the G-code file to transform (rewritten in place).
    input: PathBuf,

    /// Write the result here instead of rewriting the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Subdivision step for fuzzy interpolation (mm).
    #[arg(long)]
    resolution: Option<f64>,

    /// Minimum Z displacement (mm).
    #[arg(long, default_value_t = 0.0)]
    z_min: f64,

    /// Maximum Z displacement (mm).
    #[arg(long)]
    z_max: Option<f64>,

    /// Keep pre-existing path vertices at wall height (0 or 1).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    connect_walls: u8,

    /// Force processing on (1) or off (0). Defaults to on when the file
    /// enables fuzzy skin or a map/mask is given.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    run: Option<u8>,

    /// Compensate extrusion for the added Z travel (0 or 1).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    compensate_extrusion: u8,

    /// Print speed for fuzzy sections (mm/min).
    #[arg(long)]
    fuzzy_speed: Option<f64>,

    /// Apply fuzzy skin to top surfaces (0 or 1).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    top_surface: u8,

    /// Apply fuzzy skin to bridged lower surfaces (0 or 1).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    lower_surface: u8,

    /// Minimum clearance to keep from support structures (mm).
    #[arg(long, default_value_t = 0.1)]
    min_support_distance: f64,

    /// Multiplier for the extrusion-compensation delta on bridges.
    #[arg(long, default_value_t = 3.0)]
    bridge_compensation_multiplier: f64,

    /// Painted stroke width (mm).
    #[arg(long, default_value_t = 0.3)]
    xy_thickness: f64,

    /// Sample spacing along painted strokes (mm).
    #[arg(long, default_value_t = 0.3)]
    xy_point_dist: f64,

    /// Displacement image (PNG) for pattern mode.
    #[arg(long)]
    displacement_map: Option<PathBuf>,

    /// JSON stroke file for paint-on mode.
    #[arg(long)]
    paint_mask: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let settings = resolve_settings(&cli, &input)?;
    if !settings.run {
        info!(
            "fuzzy skin not enabled; leaving {} untouched",
            cli.input.display()
        );
        return Ok(());
    }

    let output = fuzzify(&input, &settings)
        .with_context(|| format!("transforming {}", cli.input.display()))?;

    let target = cli.output.as_ref().unwrap_or(&cli.input);
    fs::write(target, output).with_context(|| format!("writing {}", target.display()))?;
    info!("wrote {}", target.display());
    Ok(())
}

/// Merge explicit flags with the settings the slicer embedded in the
/// file. Explicit flags always win over detected values.
fn resolve_settings(cli: &Cli, input: &str) -> Result<FuzzySettings> {
    let lines: Vec<&str> = input.split('\n').collect();
    let dialect = SlicerDialect::resolve(&lines);
    let embedded = scan_settings(&lines, dialect);

    if cli.paint_mask.is_some() && embedded.fuzzy_skin_enabled {
        anyhow::bail!("paint-on mode requires the slicer's own fuzzy skin to be disabled");
    }

    let mode_selected = cli.paint_mask.is_some() || cli.displacement_map.is_some();
    let run = cli
        .run
        .map(|v| v != 0)
        .unwrap_or(embedded.fuzzy_skin_enabled || mode_selected);

    Ok(FuzzySettings {
        resolution: cli.resolution.or(embedded.point_dist).unwrap_or(0.3),
        z_min: cli.z_min,
        z_max: cli.z_max.or(embedded.thickness).unwrap_or(0.3),
        connect_walls: cli.connect_walls != 0,
        run,
        compensate_extrusion: cli.compensate_extrusion != 0,
        top_surface: cli.top_surface != 0,
        lower_surface: cli.lower_surface != 0,
        fuzzy_speed: cli.fuzzy_speed,
        min_support_distance: cli.min_support_distance,
        bridge_compensation_multiplier: cli.bridge_compensation_multiplier,
        xy_thickness: cli.xy_thickness,
        xy_point_dist: cli.xy_point_dist,
        support_clearance: embedded.support_contact_distance,
        dialect: Some(dialect),
        displacement_map: cli.displacement_map.clone(),
        paint_mask: cli.paint_mask.clone(),
    })
}
