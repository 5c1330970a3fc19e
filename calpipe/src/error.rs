//! Batch-fatal errors.
//!
//! Per-file problems are recorded in a [`crate::BatchReport`] instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::astro_image::{ImageDimensions, ImageError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No FITS files found in '{dir}'")]
    NoFitsFiles { dir: PathBuf },

    #[error(
        "None of {scanned} FITS files matched exposure {target}s ({failed} could not be read); check the exposure filter"
    )]
    NoMatchingFrames {
        target: f64,
        scanned: usize,
        failed: usize,
    },

    #[error("No frames provided for combining")]
    NoFrames,

    #[error("Dimension mismatch for frame {index}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        index: usize,
        expected: ImageDimensions,
        actual: ImageDimensions,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Malformed filename '{name}': {reason}")]
    MalformedFilename { name: String, reason: String },

    #[error("Invalid observation timestamp '{value}': expected YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp { value: String },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read config '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config '{path}': {reason}")]
    ConfigParse { path: PathBuf, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_frames_message_names_filter() {
        let err = Error::NoMatchingFrames {
            target: 180.0,
            scanned: 12,
            failed: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("180"));
        assert!(msg.contains("exposure filter"));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            index: 3,
            expected: ImageDimensions::new(100, 100),
            actual: ImageDimensions::new(200, 100),
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 3"));
        assert!(msg.contains("100"));
        assert!(msg.contains("200"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as StdError;

        let err = Error::ReadDir {
            path: PathBuf::from("/data/darks"),
            source: io::Error::new(io::ErrorKind::NotFound, "underlying error"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/data/darks"));
    }
}
