use canny_cli::{grid_from_luma, luma_from_grid, CannyEdgeDetector, Connectivity, DetectorBuilder, DetectorConfig};
use canny_core::{init_thread_pool, Grid};
use flexi_logger::{Logger, LoggerHandle};
use image::ImageReader;
use log::info;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

struct Args {
    input: PathBuf,
    output: PathBuf,
    nms: Option<PathBuf>,
    builder: DetectorBuilder,
}

fn main() {
    let _logger = setup_logging("info");
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn setup_logging(default_level: &str) -> Option<LoggerHandle> {
    Logger::try_with_env_or_str(default_level)
        .and_then(|logger| logger.log_to_stderr().start())
        .map_err(|e| eprintln!("Logger initialization failed with {e}"))
        .ok()
}

fn usage() -> String {
    "Usage: canny <input> <output> [--sigma S] [--upper U] [--lower L] [--threshold T] \
     [--outside V] [--connectivity face|full] [--threads N] [--config file.json|file.toml] \
     [--nms candidates.png]"
        .to_string()
}

fn run() -> Result<(), String> {
    let args = parse_args(env::args().skip(1))?;
    let detector = CannyEdgeDetector::from_builder(args.builder).map_err(|e| e.to_string())?;
    let summary = DetectorConfig {
        core: detector.config().clone(),
        ..DetectorConfig::default()
    }
    .summary();
    info!("{}", summary);

    init_thread_pool(detector.config().n_threads).map_err(|e| format!("Thread pool error: {e}"))?;

    let img = ImageReader::open(&args.input)
        .map_err(|e| format!("Failed to open {}: {e}", args.input.display()))?
        .decode()
        .map_err(|e| format!("Failed to decode {}: {e}", args.input.display()))?
        .to_luma8();
    let grid = grid_from_luma(&img).map_err(|e| e.to_string())?;

    let t0 = Instant::now();
    let out = detector.execute(&grid).map_err(|e| e.to_string())?;
    info!(
        "Linked {} edge pixels from {} strong seeds in {:.2?}",
        out.stats.confirmed,
        out.stats.strong,
        t0.elapsed()
    );

    let mask = out.edges.map(|&v| if v == detector.config().edge_value { 1.0 } else { 0.0 });
    save(&mask, &args.output)?;
    if let Some(path) = &args.nms {
        save(&normalized(out.non_maximum_suppression()), path)?;
    }
    Ok(())
}

fn save(grid: &Grid<f32>, path: &Path) -> Result<(), String> {
    luma_from_grid(grid)
        .map_err(|e| e.to_string())?
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))?;
    info!("Saved {}", path.display());
    Ok(())
}

/// Scale to [0, 1] by the grid maximum
fn normalized(grid: &Grid<f32>) -> Grid<f32> {
    let max = grid.as_slice().iter().fold(0.0f32, |m, &v| m.max(v));
    if max > 0.0 {
        grid.map(|&v| v / max)
    } else {
        grid.clone()
    }
}

fn parse_args<I: Iterator<Item = String>>(mut it: I) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut nms = None;
    let mut builder = DetectorBuilder::new();

    while let Some(arg) = it.next() {
        if !arg.starts_with("--") {
            positional.push(PathBuf::from(arg));
            continue;
        }
        let value = it.next().ok_or_else(|| format!("Missing value for {arg}\n{}", usage()))?;
        builder = match arg.as_str() {
            "--sigma" => builder.sigma(parse_num(&arg, &value)?),
            "--upper" => builder.upper_threshold(parse_num(&arg, &value)?),
            "--lower" => builder.lower_threshold(parse_num(&arg, &value)?),
            "--threshold" => builder.threshold(parse_num(&arg, &value)?),
            "--outside" => builder.outside_value(parse_num(&arg, &value)?),
            "--threads" => builder.threads(parse_num(&arg, &value)?),
            "--connectivity" => builder.connectivity(value.parse::<Connectivity>().map_err(|e| e.to_string())?),
            // Loaded presets replace everything set so far
            "--config" => DetectorBuilder::from_config(load_config(Path::new(&value))?),
            "--nms" => {
                nms = Some(PathBuf::from(value));
                builder
            }
            _ => return Err(format!("Unknown option {arg}\n{}", usage())),
        };
    }

    let mut positional = positional.into_iter();
    let input = positional.next().ok_or_else(usage)?;
    let output = positional.next().ok_or_else(usage)?;
    if positional.next().is_some() {
        return Err(usage());
    }
    Ok(Args {
        input,
        output,
        nms,
        builder,
    })
}

fn parse_num<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {flag}: {value}"))
}

fn load_config(path: &Path) -> Result<DetectorConfig, String> {
    let loaded = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => DetectorConfig::load_toml(path),
        _ => DetectorConfig::load_json(path),
    };
    let config = loaded.map_err(|e| format!("Failed to load config {}: {e}", path.display()))?;
    if let Some(name) = &config.name {
        info!("Using configuration '{}'", name);
    }
    Ok(config)
}
