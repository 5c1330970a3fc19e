//! File utility functions for listing and filtering files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Supported FITS file extensions.
pub const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

/// Returns `true` if the path has one of the given extensions.
/// Extensions are matched case-insensitively.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Returns paths to all files in a directory matching the given extensions.
///
/// Order follows the directory listing, which is platform dependent.
/// Subdirectories are never returned, even if their name matches.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Returns paths to all FITS files in the given directory.
pub fn fits_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    files_with_extensions(dir, FITS_EXTENSIONS)
}

/// Builds `<dir>/<stem><suffix>.<extension>` for a derived product of `path`.
pub fn derived_path(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}
