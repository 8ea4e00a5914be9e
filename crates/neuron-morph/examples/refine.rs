//! Example: clean up a morphology and write a series of refinements.
//!
//! Reads an SWC or UGX file, repairs dangling parents, sorts it, drops
//! redundant points and optionally strips or collapses the soma. Then it
//! resamples every trunk at `delta / 2^level` and writes one file per level
//! next to the output stem, plus a JSON summary.
//!
//! Run from the workspace root:
//!   cargo run -p neuron-morph --example refine -- --help
//!   cargo run -p neuron-morph --example refine -- cell.swc --levels 3 --method cubic

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use neuron_morph::{
    Format, Method, PreprocessConfig, build_trunks, collapse_soma_segment, detach_dangling,
    generate_refinements, has_soma_segment, preprocess, read_morphology, remove_soma_segment,
    set_soma, topological_sort, write_morphology,
};
use serde::Serialize;
use tracing::{Level, info, warn};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SomaMode {
    /// Leave the soma as read
    Keep,
    /// Label the first root as soma when none is present
    Set,
    /// Merge the soma segment into one node
    Collapse,
    /// Delete the soma segment
    Remove,
}

#[derive(Parser, Debug)]
#[command(about = "Resample a neuron morphology into successively finer levels")]
struct Args {
    /// Input morphology (.swc or .ugx)
    input: PathBuf,

    /// Output stem; level files are written as <stem>_level<i>.<format>
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output format (swc or ugx); defaults to the input's
    #[arg(long)]
    format: Option<String>,

    /// Resampling step of level 0
    #[arg(long, default_value_t = 2.0)]
    delta: f64,

    /// Number of refinement levels
    #[arg(long, default_value_t = 3)]
    levels: usize,

    /// Interpolation between samples (linear or cubic)
    #[arg(long, default_value = "linear")]
    method: Method,

    /// What to do with the soma before resampling
    #[arg(long, value_enum, default_value_t = SomaMode::Keep)]
    soma: SomaMode,

    /// Distance under which a node is merged into its parent
    #[arg(long, default_value_t = PreprocessConfig::default().merge_distance)]
    merge_distance: f64,

    /// Maximum deviation of a dropped colinear point
    #[arg(long, default_value_t = PreprocessConfig::default().colinear_tolerance)]
    colinear_tolerance: f64,

    /// Maximum radius deviation of a dropped colinear point from the taper
    #[arg(long, default_value_t = PreprocessConfig::default().radius_tolerance)]
    radius_tolerance: f64,

    /// Write the JSON summary here instead of stdout
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log every engine step
    #[arg(long)]
    verbose: bool,
}

// ── JSON DTOs ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct LevelDto {
    level: usize,
    delta: f64,
    nodes: usize,
    edges: usize,
    path: String,
}

#[derive(Serialize)]
struct Summary {
    input: String,
    method: String,
    nodes_read: usize,
    nodes_cleaned: usize,
    dangling_detached: usize,
    trunks: usize,
    /// Wall-clock time for the whole pipeline, in milliseconds.
    elapsed_ms: f64,
    levels: Vec<LevelDto>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn level_path(stem: &Path, level: usize, format: Format) -> PathBuf {
    let name = stem.file_name().unwrap_or_default().to_string_lossy();
    stem.with_file_name(format!("{name}_level{level}.{}", format.extension()))
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let started = Instant::now();
    let format = match &args.format {
        Some(name) => name.parse::<Format>()?,
        None => Format::from_path(&args.input)?,
    };
    let stem = args
        .out
        .clone()
        .unwrap_or_else(|| args.input.with_extension(""));

    let mut m = read_morphology(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let nodes_read = m.len();

    let dangling_detached = detach_dangling(&mut m).context("repairing dangling parents")?;
    topological_sort(&mut m).context("sorting")?;

    let cfg = PreprocessConfig {
        merge_distance: args.merge_distance,
        colinear_tolerance: args.colinear_tolerance,
        radius_tolerance: args.radius_tolerance,
    };
    let m = preprocess(&m, &cfg).context("preprocessing")?;

    let m = match args.soma {
        SomaMode::Keep => m,
        SomaMode::Set => set_soma(&m)?,
        SomaMode::Collapse if has_soma_segment(&m) => collapse_soma_segment(&m)?,
        SomaMode::Remove if has_soma_segment(&m) => remove_soma_segment(&m)?,
        SomaMode::Collapse | SomaMode::Remove => {
            warn!("no soma segment, leaving morphology unchanged");
            m
        }
    };
    info!(nodes = m.len(), "cleaned morphology");

    let trunks = build_trunks(&m, false).context("decomposing into trunks")?;
    let refinements = generate_refinements(&m, args.delta, args.levels, args.method)
        .context("generating refinements")?;

    let mut levels = Vec::with_capacity(refinements.len());
    let mut delta = args.delta;
    for (&level, refined) in &refinements {
        let path = level_path(&stem, level, format);
        write_morphology(refined, &path)
            .with_context(|| format!("writing level {level} to {}", path.display()))?;
        levels.push(LevelDto {
            level,
            delta,
            nodes: refined.len(),
            edges: refined.num_edges(),
            path: path.display().to_string(),
        });
        delta /= 2.0;
    }

    let summary = Summary {
        input: args.input.display().to_string(),
        method: args.method.to_string(),
        nodes_read,
        nodes_cleaned: m.len(),
        dangling_detached,
        trunks: trunks.len(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
        levels,
    };

    let json = serde_json::to_string_pretty(&summary).context("serializing summary")?;
    match &args.summary {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing summary to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
