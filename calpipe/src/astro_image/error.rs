use std::path::PathBuf;

use thiserror::Error;

use super::ImageDimensions;

/// Errors that can occur when reading or writing a FITS image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to access FITS file '{path}': {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },

    #[error("Primary HDU of '{path}' is not an image")]
    NotAnImage { path: PathBuf },

    #[error("Unsupported image shape {shape:?} in '{path}', expected a 2-D image")]
    UnsupportedShape { path: PathBuf, shape: Vec<usize> },

    #[error("Pixel count mismatch in '{path}': header says {expected}, read {actual}")]
    PixelCount {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Operand '{path}' is {actual:?}, expected {expected:?} to match the first operand")]
    OperandShape {
        path: PathBuf,
        expected: ImageDimensions,
        actual: ImageDimensions,
    },

    #[error("Failed to access file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported file extension: '{extension}'")]
    UnsupportedFormat { extension: String },
}
