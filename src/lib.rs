//! Gazeshot: few-shot episode datasets from gaze-tracking annotations.
//!
//! Gazeshot reads per-image XML annotations (gaze position, camera offset,
//! head pose and facial regions), groups them into tasks, and serves
//! background-randomised, optionally channel-stacked image tensors as
//! few-shot episodes for meta-learning.
//!
//! # Modules
//!
//! - [`annotation`]: Annotation records and the XML reader
//! - [`index`]: Task grouping and the train/test split
//! - [`loader`]: Image decoding, background randomisation and region stacking
//! - [`transform`]: Conversion of loaded samples into `f32` tensors
//! - [`dataset`]: The indexed dataset tying the above together
//! - [`episode`]: Few-shot task draws and label-shifted sequences
//! - [`stats`]: Gaze and head-pose groupings for error analysis
//! - [`validation`]: Pre-flight checks of records and images
//! - [`error`]: Error types for gazeshot operations

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod episode;
pub mod error;
pub mod index;
pub mod loader;
pub mod stats;
pub mod transform;
pub mod validation;

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

pub use config::{DatasetConfig, StackAnchor};
pub use dataset::GazeDataset;
pub use episode::EpisodeGenerator;
pub use error::GazeError;
pub use transform::TensorPipeline;

/// The gazeshot CLI application.
#[derive(Parser)]
#[command(name = "gazeshot")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the task groups and the train/test split of a dataset.
    Inspect(InspectArgs),
    /// Check annotations and images for errors and warnings.
    Validate(ValidateArgs),
    /// Group records by gaze position and head distance.
    Stats(StatsArgs),
    /// Draw one episode from a task and print its shapes and labels.
    Episode(EpisodeArgs),
}

/// Dataset location and construction options shared by subcommands.
#[derive(clap::Args)]
struct DatasetArgs {
    /// YAML dataset config; other flags override its values.
    #[arg(long, env = "GAZESHOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding `<filename>.png` images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Directory holding annotation XML files.
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Stack the anchor image with both eye crops.
    #[arg(long, conflicts_with = "no_stacking")]
    stacking: bool,

    /// Do not stack, even if the config enables it.
    #[arg(long)]
    no_stacking: bool,

    /// Halve region coordinates before cropping.
    #[arg(long, conflicts_with = "no_halve_regions")]
    halve_regions: bool,

    /// Keep region coordinates as written, even if the config halves them.
    #[arg(long)]
    no_halve_regions: bool,

    /// Enable pad-and-crop augmentation of eye regions.
    #[arg(long, conflicts_with = "no_random_crop")]
    random_crop: bool,

    /// Disable pad-and-crop augmentation of eye regions.
    #[arg(long)]
    no_random_crop: bool,

    /// Number of trailing tasks reserved for testing.
    #[arg(long)]
    reserve: Option<usize>,

    /// Image used as the first stacked plane.
    #[arg(long, value_enum)]
    anchor: Option<StackAnchor>,
}

impl DatasetArgs {
    fn resolve(&self) -> Result<DatasetConfig, GazeError> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::from_yaml_file(path)?,
            None => {
                let (Some(images), Some(annotations)) = (&self.images, &self.annotations) else {
                    return Err(GazeError::InvalidConfig {
                        message: "pass --config or both --images and --annotations".to_string(),
                    });
                };
                DatasetConfig::new(images, annotations)
            }
        };

        if let Some(images) = &self.images {
            config.image_dir = images.clone();
        }
        if let Some(annotations) = &self.annotations {
            config.annotation_dir = annotations.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(reserve) = self.reserve {
            config.reserved_test_tasks = reserve;
        }
        if let Some(anchor) = self.anchor {
            config.stack_anchor = anchor;
        }
        if let Some(stacking) = switch(self.stacking, self.no_stacking) {
            config.stacking = stacking;
        }
        if let Some(halve) = switch(self.halve_regions, self.no_halve_regions) {
            config.halve_regions = halve;
        }
        if let Some(random_crop) = switch(self.random_crop, self.no_random_crop) {
            config.random_crop = random_crop;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Value of an `--x` / `--no-x` flag pair; `None` keeps the config value.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// Directory holding annotation XML files.
    annotations: PathBuf,

    /// Upper end of the gaze y range.
    #[arg(long, default_value_t = 0.349)]
    y_limit: f64,

    /// Number of gaze y buckets.
    #[arg(long, default_value_t = 10)]
    y_bins: usize,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the episode subcommand.
#[derive(clap::Args)]
struct EpisodeArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// Task position to draw from.
    #[arg(long)]
    task: usize,

    /// Number of samples requested from the task.
    #[arg(long, default_value_t = 100)]
    samples: usize,

    /// Group the sequence into batches of this size.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Random seed for reproducible draws.
    #[arg(long)]
    seed: Option<u64>,

    /// Apply random per-channel gains.
    #[arg(long)]
    recolor: bool,

    /// Output format for the summary ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the gazeshot CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), GazeError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Stats(args)) => run_stats(args),
        Some(Commands::Episode(args)) => run_episode(args),
        None => {
            println!("gazeshot {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Few-shot episode datasets from gaze-tracking annotations.");
            println!();
            println!("Run 'gazeshot --help' for usage information.");
            Ok(())
        }
    }
}

/// Print a report as text or pretty JSON.
fn emit<T: Serialize + fmt::Display>(report: &T, output: &str) -> Result<(), GazeError> {
    match output {
        "text" => print!("{}", report),
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        other => {
            return Err(GazeError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), GazeError> {
    let config = args.dataset.resolve()?;
    let records = annotation::read_annotation_dir(&config.annotation_dir)?;
    let index = index::DatasetIndex::build(&records, config.reserved_test_tasks)?;

    emit(&index::IndexReport::from_index(&index), &args.output)
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), GazeError> {
    let config = args.dataset.resolve()?;
    let records = annotation::read_annotation_dir(&config.annotation_dir)?;

    let mut opts = validation::ValidateOptions::for_config(&config);
    opts.strict = args.strict;
    let report = validation::validate_records(&records, &config.image_dir, &opts);

    emit(&report, &args.output)?;

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(GazeError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_stats(args: StatsArgs) -> Result<(), GazeError> {
    if args.y_bins == 0 || args.y_limit.is_nan() || args.y_limit <= 0.0 {
        return Err(GazeError::InvalidConfig {
            message: "--y-bins and --y-limit must be positive".to_string(),
        });
    }

    let records = annotation::read_annotation_dir(&args.annotations)?;
    let binning = stats::GazeBinning {
        limit: args.y_limit,
        bins: args.y_bins,
    };

    emit(&stats::GazeStatsReport::compute(&records, binning)?, &args.output)
}

fn run_episode(args: EpisodeArgs) -> Result<(), GazeError> {
    let config = args.dataset.resolve()?;
    let pipeline = if args.recolor {
        TensorPipeline::with_recolor()
    } else {
        TensorPipeline::plain()
    };
    let dataset = GazeDataset::open(config, pipeline)?;

    let summary = if let Some(seed) = args.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        summarize_episode(&dataset, &args, &mut rng)?
    } else {
        let mut rng = rand::rng();
        summarize_episode(&dataset, &args, &mut rng)?
    };

    emit(&summary, &args.output)
}

fn summarize_episode<R: Rng + ?Sized>(
    dataset: &GazeDataset,
    args: &EpisodeArgs,
    rng: &mut R,
) -> Result<episode::EpisodeSummary, GazeError> {
    let generator = EpisodeGenerator::new(dataset);
    let task_id = dataset.index().task_id(args.task)?.to_string();

    match args.batch_size {
        Some(batch_size) => {
            let (steps, _) = generator.batched_episode(args.task, args.samples, batch_size, rng)?;
            Ok(episode::EpisodeSummary::batched(
                args.task, task_id, batch_size, &steps,
            ))
        }
        None => {
            let (steps, _) = generator.sequential_episode(args.task, args.samples, rng)?;
            Ok(episode::EpisodeSummary::sequential(args.task, task_id, &steps))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolve(args: &[&str]) -> Result<DatasetConfig, GazeError> {
        let argv = ["gazeshot", "inspect"].into_iter().chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).expect("parse arguments");
        match cli.command {
            Some(Commands::Inspect(inspect)) => inspect.dataset.resolve(),
            _ => panic!("expected the inspect subcommand"),
        }
    }

    fn yaml_config(dir: &std::path::Path, flags: &str) -> String {
        let path = dir.join("gazeshot.yaml");
        fs::write(
            &path,
            format!("image_dir: images\nannotation_dir: annotations\n{flags}"),
        )
        .expect("write config");
        path.display().to_string()
    }

    #[test]
    fn negative_flags_override_enabled_config_values() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = yaml_config(
            temp.path(),
            "stacking: true\nhalve_regions: true\nrandom_crop: true\n",
        );

        let kept = resolve(&["--config", &path]).expect("resolve config");
        assert!(kept.stacking && kept.halve_regions && kept.random_crop);

        let config = resolve(&[
            "--config",
            &path,
            "--no-stacking",
            "--no-halve-regions",
            "--no-random-crop",
        ])
        .expect("resolve config");
        assert!(!config.stacking);
        assert!(!config.halve_regions);
        assert!(!config.random_crop);
    }

    #[test]
    fn positive_flags_override_disabled_config_values() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = yaml_config(
            temp.path(),
            "stacking: false\nhalve_regions: false\nrandom_crop: false\n",
        );

        let config = resolve(&[
            "--config",
            &path,
            "--stacking",
            "--halve-regions",
            "--random-crop",
        ])
        .expect("resolve config");
        assert!(config.stacking);
        assert!(config.halve_regions);
        assert!(config.random_crop);
    }

    #[test]
    fn conflicting_flag_pairs_are_rejected() {
        let result = Cli::try_parse_from([
            "gazeshot",
            "inspect",
            "--images",
            "i",
            "--annotations",
            "a",
            "--stacking",
            "--no-stacking",
        ]);
        assert!(result.is_err());
    }
}
