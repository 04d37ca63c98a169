//! mkf CLI: marker-anchored fusion of recorded RGBD sequences.

use std::ops::Range;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use mkf_core::FrameSource;
use mkf_fusion::{Reconstruction, ReconstructionConfig};
use mkf_io::{
    load_config, load_intrinsics, write_ply, FrameDirectory, RunReport, SidecarDetections,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "mkf")]
#[command(about = "Fuse RGBD frames into one point cloud using fiducial markers as anchors")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a dataset directory into a PLY point cloud.
    Reconstruct(ReconstructArgs),
}

#[derive(Debug, Clone, Args)]
struct ReconstructArgs {
    /// Dataset root holding color/, depth/ and markers/.
    #[arg(long)]
    dataset: PathBuf,

    /// Camera intrinsics JSON (default: <dataset>/intrinsics.json).
    #[arg(long)]
    intrinsics: Option<PathBuf>,

    /// Directory of per-frame marker detections (default: <dataset>/markers).
    #[arg(long)]
    markers: Option<PathBuf>,

    /// Reconstruction config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PLY path.
    #[arg(long)]
    out: PathBuf,

    /// Optional JSON run report.
    #[arg(long)]
    report: Option<PathBuf>,

    /// First frame index to fuse.
    #[arg(long, default_value_t = 0)]
    first: usize,

    /// Last frame index to fuse, inclusive (default: last frame on disk).
    #[arg(long)]
    last: Option<usize>,

    /// Keep the support plane instead of removing it.
    #[arg(long)]
    no_plane: bool,

    /// Plane inlier distance threshold.
    #[arg(long)]
    plane_threshold: Option<f64>,

    /// Plane RANSAC iteration budget.
    #[arg(long)]
    plane_iterations: Option<usize>,

    /// RANSAC seed.
    #[arg(long)]
    seed: Option<u64>,

    /// BFGS gradient-norm tolerance.
    #[arg(long)]
    gradient_tolerance: Option<f64>,

    /// BFGS iteration budget.
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Reject registrations whose mean marker distance exceeds this.
    #[arg(long, conflicts_with = "no_distance_gate")]
    max_mean_distance: Option<f64>,

    /// Accept registrations regardless of their mean marker distance.
    #[arg(long)]
    no_distance_gate: bool,
}

impl ReconstructArgs {
    fn build_config(&self) -> CliResult<ReconstructionConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ReconstructionConfig::default(),
        };

        if self.no_plane {
            config.plane.enabled = false;
        }
        if let Some(v) = self.plane_threshold {
            config.plane.distance_threshold = v;
        }
        if let Some(v) = self.plane_iterations {
            config.plane.max_iterations = v;
        }
        if let Some(v) = self.seed {
            config.plane.seed = v;
        }
        if let Some(v) = self.gradient_tolerance {
            config.registration.gradient_tolerance = v;
        }
        if let Some(v) = self.max_iterations {
            config.registration.max_iterations = v;
        }
        if let Some(v) = self.max_mean_distance {
            config.registration.max_mean_distance = Some(v);
        }
        if self.no_distance_gate {
            config.registration.max_mean_distance = None;
        }

        config.validate()?;
        Ok(config)
    }

    fn frame_range(&self, available: usize) -> CliResult<Range<usize>> {
        let end = match self.last {
            Some(last) => last.saturating_add(1),
            None => available,
        };
        if self.first >= end {
            return Err(format!(
                "no frames to fuse: first={} but the sequence ends before index {}",
                self.first, end
            )
            .into());
        }
        Ok(self.first..end)
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Reconstruct(args) => run_reconstruct(&args),
    }
}

fn run_reconstruct(args: &ReconstructArgs) -> CliResult<()> {
    let config = args.build_config()?;
    let intrinsics_path = args
        .intrinsics
        .clone()
        .unwrap_or_else(|| args.dataset.join("intrinsics.json"));
    let intrinsics = load_intrinsics(&intrinsics_path)?;

    let mut source = FrameDirectory::open(&args.dataset)?;
    let markers_dir = args.markers.clone().unwrap_or_else(|| source.markers_dir());
    let detector = SidecarDetections::new(markers_dir);
    let range = args.frame_range(source.frame_count())?;
    info!(
        "Fusing frames {}..={} of {}",
        range.start,
        range.end - 1,
        source.root().display()
    );

    let frames = range.len();
    let reconstruction = Reconstruction::new(intrinsics, &config)?;
    let result = reconstruction.run_range(&mut source, &detector, range)?;

    let failed = result.failed_frame_indices();
    if failed.is_empty() {
        info!("All frames fused");
    } else {
        warn!("{} frames failed: {:?}", failed.len(), failed);
    }
    if result.reference_index.is_none() {
        warn!("No frame contained markers; the output cloud is empty");
    }

    write_ply(&args.out, &result.cloud)?;
    info!("Wrote {} points to {}", result.cloud.len(), args.out.display());

    if let Some(path) = &args.report {
        RunReport::new(&result, frames).write_json(path)?;
        info!("Wrote report to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> ReconstructArgs {
        let mut argv = vec!["mkf", "reconstruct", "--dataset", "data", "--out", "cloud.ply"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Reconstruct(args) => args,
        }
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).build_config().unwrap();
        assert_eq!(config, ReconstructionConfig::default());
    }

    #[test]
    fn test_flag_overrides() {
        let config = parse(&[
            "--no-plane",
            "--plane-threshold",
            "0.02",
            "--no-distance-gate",
            "--max-iterations",
            "50",
        ])
        .build_config()
        .unwrap();
        assert!(!config.plane.enabled);
        assert_eq!(config.plane.distance_threshold, 0.02);
        assert_eq!(config.registration.max_mean_distance, None);
        assert_eq!(config.registration.max_iterations, 50);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(parse(&["--gradient-tolerance", "0"]).build_config().is_err());
    }

    #[test]
    fn test_frame_range() {
        assert_eq!(parse(&[]).frame_range(5).unwrap(), 0..5);
        assert_eq!(parse(&["--first", "1", "--last", "3"]).frame_range(5).unwrap(), 1..4);
        assert!(parse(&["--first", "5"]).frame_range(5).is_err());
        assert!(parse(&[]).frame_range(0).is_err());
        let max = usize::MAX.to_string();
        assert_eq!(
            parse(&["--first", "2", "--last", max.as_str()]).frame_range(5).unwrap(),
            2..usize::MAX
        );
    }
}
