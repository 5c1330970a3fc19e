//! Command-line front end for the reduction pipeline.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use calpipe::{
    build_catalog, build_master, calibrate, FitsArithmetic, FitsHeaders, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch reduction of observatory FITS frames")]
struct Args {
    /// Pipeline config file (.yaml, .yml or .json); defaults are used without one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write daily log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Average same-exposure frames into a master frame
    Master {
        /// Directory of input frames
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Master frame file to write
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exposure time frames must have, in seconds
        #[arg(long)]
        exposure: Option<f64>,

        /// Outlier brightness threshold in ADU
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Write a text catalog of the frames in a directory
    Catalog {
        /// Directory of frames
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Catalog file to write
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Bias, dark and flat calibrate science frames
    Calibrate {
        /// Directory of science frames
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Root of the calibration store
        #[arg(long)]
        cal_root: Option<PathBuf>,

        /// Keep the outputs of intermediate steps
        #[arg(long, default_value_t = false)]
        keep_intermediates: bool,
    },

    /// Write the effective configuration to a file, as a starting point for editing
    InitConfig {
        /// File to write (.yaml, .yml or .json)
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    common::log_setup::setup_logging(&args.log_level, args.log_dir.as_deref())
        .context("Failed to set up logging")?;

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Command::Master {
            input_dir,
            output,
            exposure,
            threshold,
        } => {
            let master = &mut config.master;
            if let Some(dir) = input_dir {
                master.input_dir = dir;
            }
            if let Some(output) = output {
                master.output_dir = output
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_default();
                master.output_name = match output.file_name() {
                    Some(name) => name.to_string_lossy().into_owned(),
                    None => bail!("--output '{}' has no file name", output.display()),
                };
            }
            if let Some(exposure) = exposure {
                master.target_exposure = exposure;
            }
            if let Some(threshold) = threshold {
                master.outlier_threshold = threshold;
            }

            let summary = build_master(master, &FitsHeaders).context("Master frame failed")?;
            tracing::info!(
                frames = summary.inputs.len(),
                width = summary.dimensions.width,
                height = summary.dimensions.height,
                outliers = summary.outliers,
                output = %summary.output.display(),
                "Master frame done"
            );
            println!(
                "{} outlier pixels at or above {}",
                summary.outliers, master.outlier_threshold
            );
        }

        Command::Catalog { input_dir, output } => {
            let catalog = &mut config.catalog;
            if let Some(dir) = input_dir {
                catalog.input_dir = dir;
            }
            if let Some(output) = output {
                catalog.output = output;
            }

            let report = build_catalog(catalog, &FitsHeaders).context("Catalog failed")?;
            tracing::info!(output = %catalog.output.display(), "Catalog done: {report}");
        }

        Command::Calibrate {
            input_dir,
            cal_root,
            keep_intermediates,
        } => {
            let calibration = &mut config.calibration;
            if let Some(dir) = input_dir {
                calibration.image_dir = dir;
            }
            if let Some(root) = cal_root {
                calibration.cal_root = root;
            }
            calibration.keep_intermediates |= keep_intermediates;

            let run = calibrate(calibration, &FitsArithmetic).context("Calibration failed")?;
            for (step, report) in &run.steps {
                tracing::info!("{step}: {report}");
            }
            tracing::info!(outputs = run.outputs.len(), "Calibration done");
        }

        Command::InitConfig { path } => {
            config
                .save(&path)
                .with_context(|| format!("Failed to write config '{}'", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote config");
        }
    }

    Ok(())
}
