//! Headless scroll simulation.
//!
//! `packgrid --simulate` drives a `VirtualGrid` over a `HeadlessSurface`
//! through full top-to-bottom-to-top scroll passes, a far jump and a resize,
//! and prints `key=value` lines describing how much work the window did.

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::GridConfig;
use crate::grid::{HeadlessSurface, ReconcileOutcome, ScrollProximity, VirtualGrid};
use crate::models::{ItemCollection, MediaItem};
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq)]
pub enum ItemSource {
    Directory(PathBuf),
    Synthetic(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationArgs {
    pub source: ItemSource,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Pixels scrolled per simulated frame.
    pub step: f32,
    pub passes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub items: usize,
    pub columns: usize,
    pub capacity: usize,
    pub frames: usize,
    pub shifts: usize,
    pub capped: usize,
    pub built: usize,
    pub destroyed: usize,
    pub peak_elements: usize,
    pub frame_p50_ms: f64,
    pub frame_p95_ms: f64,
    pub resized_columns: usize,
}

/// Parses process arguments; `None` when not in simulation mode.
pub fn maybe_parse_args() -> Result<Option<SimulationArgs>> {
    parse_args(env::args().skip(1))
}

pub fn parse_args<I>(args: I) -> Result<Option<SimulationArgs>>
where
    I: IntoIterator<Item = String>,
{
    let mut simulate = false;
    let mut path: Option<PathBuf> = None;
    let mut items: usize = 10_000;
    let mut viewport = (1280.0f32, 800.0f32);
    let mut step = 120.0f32;
    let mut passes: usize = 1;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--simulate" => simulate = true,
            "--path" => {
                let value = args
                    .next()
                    .context("Missing value for --path in simulation mode")?;
                path = Some(PathBuf::from(value));
            }
            "--items" => {
                let value = args
                    .next()
                    .context("Missing value for --items in simulation mode")?;
                items = value
                    .parse::<usize>()
                    .context("Failed to parse --items as a non-negative integer")?;
            }
            "--viewport" => {
                let value = args
                    .next()
                    .context("Missing value for --viewport in simulation mode")?;
                viewport = parse_viewport(&value)?;
            }
            "--step" => {
                let value = args
                    .next()
                    .context("Missing value for --step in simulation mode")?;
                step = value
                    .parse::<f32>()
                    .context("Failed to parse --step as a number of pixels")?;
            }
            "--passes" => {
                let value = args
                    .next()
                    .context("Missing value for --passes in simulation mode")?;
                passes = value
                    .parse::<usize>()
                    .context("Failed to parse --passes as a positive integer")?;
            }
            _ => {}
        }
    }

    if !simulate {
        return Ok(None);
    }
    if !(step.is_finite() && step > 0.0) {
        bail!("--step must be greater than 0");
    }
    if passes == 0 {
        bail!("--passes must be greater than 0");
    }

    let source = match path {
        Some(path) => ItemSource::Directory(path),
        None => ItemSource::Synthetic(items),
    };
    Ok(Some(SimulationArgs {
        source,
        viewport_width: viewport.0,
        viewport_height: viewport.1,
        step,
        passes,
    }))
}

fn parse_viewport(value: &str) -> Result<(f32, f32)> {
    let (w, h) = value
        .split_once('x')
        .with_context(|| format!("Expected --viewport as WIDTHxHEIGHT, got {:?}", value))?;
    let w = w.parse::<f32>().context("Failed to parse viewport width")?;
    let h = h.parse::<f32>().context("Failed to parse viewport height")?;
    if w <= 0.0 || h <= 0.0 {
        bail!("Viewport dimensions must be positive, got {}x{}", w, h);
    }
    Ok((w, h))
}

/// Items named like a pack of mixed media, for runs without a directory.
pub fn synthetic_items(count: usize) -> Result<ItemCollection> {
    const EXTENSIONS: [&str; 4] = ["png", "jpg", "webm", "opus"];
    let items = (0..count)
        .map(|i| {
            let ext = EXTENSIONS[i % EXTENSIONS.len()];
            MediaItem::new(PathBuf::from(format!("synthetic/{:07}.{}", i, ext)))
                .with_dimensions(1920, 1080)
        })
        .collect();
    ItemCollection::new(items).context("Synthetic items have clashing ids")
}

fn load_items(source: &ItemSource) -> Result<ItemCollection> {
    match source {
        ItemSource::Synthetic(count) => synthetic_items(*count),
        ItemSource::Directory(path) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime for simulation")?;
            let result = runtime
                .block_on(FileScanner::new().scan(path))
                .with_context(|| format!("Failed to scan {}", path.display()))?;
            println!(
                "phase=scan done total={} skipped={} errors={}",
                result.items.len(),
                result.skipped,
                result.errors
            );
            Ok(result.items)
        }
    }
}

pub fn simulate(items: ItemCollection, config: GridConfig, args: &SimulationArgs) -> Result<SimulationReport> {
    let monitor = ScrollProximity::new(config.proximity_threshold);
    let mut grid = VirtualGrid::new(items, config, HeadlessSurface::default(), monitor)
        .context("Failed to create grid")?;
    grid.fit_viewport(args.viewport_width, args.viewport_height)
        .context("Failed to attach grid")?;

    let mut report = SimulationReport {
        items: grid.items().len(),
        columns: grid.layout().columns,
        capacity: grid.layout().capacity,
        ..Default::default()
    };
    let mut frame_ms = Vec::new();
    let mut record = |outcome: ReconcileOutcome, started: Instant, report: &mut SimulationReport| {
        frame_ms.push(started.elapsed().as_secs_f64() * 1000.0);
        report.frames += 1;
        report.shifts += outcome.steps();
        if matches!(outcome, ReconcileOutcome::Capped { .. }) {
            report.capped += 1;
        }
    };

    let bottom = (grid.layout().content_height() - args.viewport_height).max(0.0);
    for pass in 0..args.passes {
        let mut top = 0.0f32;
        while top <= bottom {
            let started = Instant::now();
            let outcome = grid.scroll_to(top).context("Scroll down failed")?;
            record(outcome, started, &mut report);
            top += args.step;
        }
        while top > 0.0 {
            top = (top - args.step).max(0.0);
            let started = Instant::now();
            let outcome = grid.scroll_to(top).context("Scroll up failed")?;
            record(outcome, started, &mut report);
        }
        println!("pass={} frames={} shifts={}", pass + 1, report.frames, report.shifts);
    }

    // Far jump to the middle, then a resize at that position.
    let started = Instant::now();
    let outcome = grid.scroll_to(bottom / 2.0).context("Jump failed")?;
    record(outcome, started, &mut report);

    let started = Instant::now();
    let outcome = grid
        .fit_viewport(args.viewport_width * 0.5, args.viewport_height)
        .context("Resize failed")?;
    record(outcome, started, &mut report);
    report.resized_columns = grid.layout().columns;

    report.built = grid.surface().built();
    report.destroyed = grid.surface().detached();
    report.peak_elements = grid.surface().peak();
    report.frame_p50_ms = percentile_ms(&frame_ms, 0.50);
    report.frame_p95_ms = percentile_ms(&frame_ms, 0.95);
    Ok(report)
}

pub fn run_simulation(args: SimulationArgs) -> Result<i32> {
    let config = GridConfig::from_env().context("Invalid PACKGRID_* configuration")?;
    println!("phase=load start");
    let items = load_items(&args.source)?;

    println!("phase=simulate start items={}", items.len());
    let start = Instant::now();
    let report = simulate(items, config, &args)?;
    let elapsed_ms = start.elapsed().as_millis();

    println!("items={}", report.items);
    println!("columns={}", report.columns);
    println!("capacity={}", report.capacity);
    println!("frames={}", report.frames);
    println!("shifts={}", report.shifts);
    println!("capped={}", report.capped);
    println!("elements_built={}", report.built);
    println!("elements_destroyed={}", report.destroyed);
    println!("peak_elements={}", report.peak_elements);
    println!("frame_p50_ms={:.3}", report.frame_p50_ms);
    println!("frame_p95_ms={:.3}", report.frame_p95_ms);
    println!("resized_columns={}", report.resized_columns);
    println!("elapsed_ms={}", elapsed_ms);
    info!(elapsed_ms, "simulation complete");

    Ok(if report.capped == 0 { 0 } else { 1 })
}

fn percentile_ms(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let clamped = p.clamp(0.0, 1.0);
    let idx = ((sorted.len() - 1) as f64 * clamped).round() as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Option<SimulationArgs>> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_not_simulation_mode() {
        assert_eq!(args(&["/some/dir"]).unwrap(), None);
    }

    #[test]
    fn test_parse_full_args() {
        let parsed = args(&[
            "--simulate",
            "--items",
            "500",
            "--viewport",
            "700x400",
            "--step",
            "90",
            "--passes",
            "3",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(parsed.source, ItemSource::Synthetic(500));
        assert_eq!((parsed.viewport_width, parsed.viewport_height), (700.0, 400.0));
        assert_eq!(parsed.step, 90.0);
        assert_eq!(parsed.passes, 3);

        let parsed = args(&["--simulate", "--path", "/media"]).unwrap().unwrap();
        assert_eq!(parsed.source, ItemSource::Directory(PathBuf::from("/media")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&["--simulate", "--items"]).is_err());
        assert!(args(&["--simulate", "--viewport", "700"]).is_err());
        assert!(args(&["--simulate", "--viewport", "0x400"]).is_err());
        assert!(args(&["--simulate", "--passes", "0"]).is_err());
        assert!(args(&["--simulate", "--step", "-5"]).is_err());
    }

    #[test]
    fn test_simulation_stays_bounded() {
        let sim = SimulationArgs {
            source: ItemSource::Synthetic(3_000),
            viewport_width: 700.0,
            viewport_height: 400.0,
            step: 200.0,
            passes: 2,
        };
        let report = simulate(synthetic_items(3_000).unwrap(), GridConfig::default(), &sim).unwrap();
        assert_eq!(report.columns, 4);
        assert_eq!(report.capped, 0);
        assert!(report.peak_elements <= report.capacity);
        assert!(report.built > report.capacity);
        assert_eq!(report.resized_columns, 2);
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile_ms(&[], 0.5), 0.0);
        assert_eq!(percentile_ms(&[3.0, 1.0, 2.0], 0.5), 2.0);
        assert_eq!(percentile_ms(&[3.0, 1.0, 2.0], 1.0), 3.0);
    }
}
