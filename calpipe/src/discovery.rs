//! Finding FITS frames in a directory and filtering them by header values.

use std::path::{Path, PathBuf};

use crate::astro_image::{Header, HeaderSource};
use crate::error::{Error, Result};
use crate::report::BatchReport;

/// FITS files directly inside `dir`, in directory-listing order.
///
/// A directory that cannot be read is an error; an empty one is not.
pub fn fits_files(dir: &Path) -> Result<Vec<PathBuf>> {
    common::file_utils::fits_files(dir).map_err(|source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Exposure time from the first keyword in `keys` that holds a number.
pub fn exposure_time(header: &Header, keys: &[String]) -> Option<f64> {
    header.first_number(keys).map(|(_, v)| v)
}

/// Compare an exposure against a target. A zero tolerance means exact equality.
pub fn exposure_matches(exposure: f64, target: f64, tolerance: f64) -> bool {
    if tolerance == 0.0 {
        exposure == target
    } else {
        (exposure - target).abs() <= tolerance
    }
}

/// Result of filtering frames by exposure time.
#[derive(Debug, Clone, Default)]
pub struct ExposureSelection {
    /// Frames whose exposure matched, in input order
    pub matched: Vec<PathBuf>,
    /// Exposure of every readable frame, and why the others could not be read
    pub scanned: BatchReport<f64>,
}

/// Keep the frames whose exposure time equals `target`.
///
/// Each header is opened and closed before the next file is touched.
/// Unreadable files and files without an exposure keyword are recorded as
/// failures and the scan continues.
pub fn select_by_exposure(
    files: &[PathBuf],
    target: f64,
    tolerance: f64,
    keys: &[String],
    headers: &impl HeaderSource,
) -> ExposureSelection {
    let mut selection = ExposureSelection::default();

    for path in files {
        let header = match headers.read_header(path) {
            Ok(header) => header,
            Err(e) => {
                selection.scanned.fail(path, e);
                continue;
            }
        };

        let Some(exposure) = exposure_time(&header, keys) else {
            selection
                .scanned
                .fail(path, format!("no exposure keyword among {keys:?}"));
            continue;
        };

        if exposure_matches(exposure, target, tolerance) {
            tracing::debug!(path = %path.display(), exposure, "Exposure matched");
            selection.matched.push(path.clone());
        }
        selection.scanned.done(path, exposure);
    }

    selection
}

/// Replace spaces with underscores in file names, renaming on disk.
///
/// Names without spaces are passed through untouched. A failed rename is
/// recorded and that file is dropped from the successful outputs.
pub fn fix_filenames(files: &[PathBuf]) -> BatchReport<PathBuf> {
    let mut report = BatchReport::new();

    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            report.fail(path, "path has no file name");
            continue;
        };

        if !name.contains(' ') {
            report.done(path, path.clone());
            continue;
        }

        let renamed = path.with_file_name(name.replace(' ', "_"));
        tracing::info!(original = %path.display(), renamed = %renamed.display(), "Renaming");
        match std::fs::rename(path, &renamed) {
            Ok(()) => report.done(path, renamed),
            Err(e) => report.fail(path, format!("rename failed: {e}")),
        }
    }

    report
}
