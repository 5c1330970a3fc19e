//! Bias, dark and flat calibration of science frames against a calibration store.

pub mod arithmetic;
pub mod night;
pub mod resolver;
pub mod steps;


use std::path::{Path, PathBuf};

pub use arithmetic::{ArithmeticOp, FitsArithmetic, ImageArithmetic, Operand};
pub use night::ObservingNight;
pub use resolver::{CalibrationStore, Candidate};
pub use steps::Calibrator;

use crate::config::{CalibrationConfig, CalibrationStep};
use crate::discovery::{fits_files, fix_filenames};
use crate::error::{Error, Result};
use crate::report::BatchReport;

/// Reports from one [`calibrate`] run.
#[derive(Debug, Clone)]
pub struct CalibrationRun {
    /// Filename fixing, when enabled
    pub renamed: Option<BatchReport<PathBuf>>,
    /// One report per executed step, in order
    pub steps: Vec<(CalibrationStep, BatchReport<PathBuf>)>,
    /// Outputs of the last step
    pub outputs: Vec<PathBuf>,
}

/// Calibrate every FITS frame in `config.image_dir`.
///
/// Each configured step consumes the successful outputs of the one before.
/// Unless `keep_intermediates` is set, an intermediate output is deleted once
/// the next step has produced something from it; one the next step skipped or
/// failed on stays on disk. The input frames are never touched apart from
/// the optional rename.
pub fn calibrate(
    config: &CalibrationConfig,
    arith: &impl ImageArithmetic,
) -> Result<CalibrationRun> {
    let mut images = fits_files(&config.image_dir)?;
    if images.is_empty() {
        return Err(Error::NoFitsFiles {
            dir: config.image_dir.clone(),
        });
    }
    tracing::info!(
        dir = %config.image_dir.display(),
        cal_root = %config.cal_root.display(),
        count = images.len(),
        "Calibrating"
    );

    let renamed = config.fix_filenames.then(|| {
        let report = fix_filenames(&images);
        images = report.succeeded().cloned().collect();
        report
    });

    let calibrator = Calibrator::new(config, arith);
    let mut steps = Vec::with_capacity(config.steps.len());
    for (index, &step) in config.steps.iter().enumerate() {
        let report = calibrator.run_step(step, &images);
        let outputs: Vec<PathBuf> = report.succeeded().cloned().collect();
        if index > 0 && !config.keep_intermediates {
            let consumed: Vec<&Path> = report.succeeded_inputs().collect();
            clean_ancillary(&consumed);
        }
        images = outputs;
        steps.push((step, report));
    }

    Ok(CalibrationRun {
        renamed,
        steps,
        outputs: images,
    })
}

/// Delete the files that exist. Returns how many were removed.
pub fn clean_ancillary(files: &[impl AsRef<Path>]) -> usize {
    let mut removed = 0;
    for path in files.iter().map(AsRef::as_ref) {
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
        }
    }
    tracing::debug!(removed, "Removed intermediate files");
    removed
}
