//! Head pose estimation from landmark streams.
//!
//! Reads one frame per line (a JSON array of normalized `{x, y}` landmarks, six
//! pose landmarks or a full face mesh) and writes one JSON pose per line.

use anyhow::{Context, Result};
use clap::Parser;
use head_pose_pnp::{config::Config, face_model::NormalizedLandmark, pose_estimation::PoseEstimator};
use log::{debug, info, warn};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Landmark file in JSON Lines format (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Image width in pixels (overrides the config file)
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels (overrides the config file)
    #[arg(long)]
    height: Option<u32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Include rotation/translation vectors and solver diagnostics
    #[arg(long)]
    diagnostics: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Merge command line overrides into the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(width) = self.width {
            config.camera.image_width = width;
        }
        if let Some(height) = self.height {
            config.camera.image_height = height;
        }
        if self.diagnostics {
            config.output.diagnostics = true;
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        Config::default()
    };
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let estimator = PoseEstimator::from_config(&config)?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin().lock())),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let (processed, skipped) = run(&estimator, &config, reader, &mut out)?;
    out.flush()?;
    info!("Processed {processed} frames, skipped {skipped}");

    Ok(())
}

/// Estimate a pose for every frame; invalid frames are logged and skipped
fn run<R: BufRead, W: Write>(
    estimator: &PoseEstimator,
    config: &Config,
    reader: R,
    out: &mut W,
) -> Result<(usize, usize)> {
    let mut processed = 0;
    let mut skipped = 0;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let landmarks: Vec<NormalizedLandmark> = match serde_json::from_str(&line) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                warn!("Skipping frame {}: {e}", line_number + 1);
                skipped += 1;
                continue;
            }
        };

        match estimator.estimate_pose(&landmarks) {
            Ok(pose) => {
                debug!(
                    "Frame {}: {:?} after {} iterations",
                    line_number + 1,
                    pose.solution.termination,
                    pose.solution.iterations
                );
                let report = pose.report(config.output.diagnostics, config.output.precision);
                serde_json::to_writer(&mut *out, &report)?;
                writeln!(out)?;
                processed += 1;
            }
            Err(e) => {
                warn!("Skipping frame {}: {e}", line_number + 1);
                skipped += 1;
            }
        }
    }

    Ok((processed, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use head_pose_pnp::pose_estimation::PoseReport;

    const FRONTAL: &str = r#"[{"x":0.5,"y":0.5},{"x":0.5,"y":0.67154},{"x":0.41461,"y":0.41398},{"x":0.44286,"y":0.57619},{"x":0.55714,"y":0.57619},{"x":0.58539,"y":0.41398}]"#;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["head-pose-pnp"]).unwrap();
        assert!(args.input.is_none());
        assert!(!args.diagnostics);
        assert!(!args.debug);

        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "head-pose-pnp",
            "--width",
            "1280",
            "--height",
            "720",
            "--diagnostics",
            "-i",
            "frames.jsonl",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("frames.jsonl")));

        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.camera.image_width, 1280);
        assert_eq!(config.camera.image_height, 720);
        assert!(config.output.diagnostics);
    }

    #[test]
    fn test_invalid_width() {
        assert!(Args::try_parse_from(["head-pose-pnp", "--width", "-5"]).is_err());
    }

    #[test]
    fn test_run_skips_bad_frames() {
        let config = Config::default();
        let estimator = PoseEstimator::from_config(&config).unwrap();
        let input = format!("{FRONTAL}\nnot json\n\n[{{\"x\":0.5,\"y\":0.5}}]\n{FRONTAL}\n");

        let mut out = Vec::new();
        let (processed, skipped) = run(&estimator, &config, input.as_bytes(), &mut out).unwrap();
        assert_eq!((processed, skipped), (2, 2));

        let text = String::from_utf8(out).unwrap();
        let reports: Vec<PoseReport> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].yaw.abs() < 1.0);
        assert!(reports[0].iterations.is_none());
    }

    #[test]
    fn test_run_with_diagnostics() {
        let mut config = Config::default();
        config.output.diagnostics = true;
        let estimator = PoseEstimator::from_config(&config).unwrap();

        let mut out = Vec::new();
        run(&estimator, &config, FRONTAL.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"termination\""));
        assert!(text.contains("\"translation_vector\""));
    }
}
