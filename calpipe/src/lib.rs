//! calpipe - batch reduction of observatory FITS frames.
//!
//! - Master calibration frames: pixel-wise mean of same-exposure frames
//! - Plain-text observation catalogs built from frame headers
//! - Bias, dark and flat calibration against a dated calibration store
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use calpipe::{build_master, FitsHeaders, MasterFrameConfig};
//!
//! let config = MasterFrameConfig {
//!     input_dir: "darks/20140623".into(),
//!     target_exposure: 180.0,
//!     ..MasterFrameConfig::default()
//! };
//! let summary = build_master(&config, &FitsHeaders)?;
//! println!("{} outlier pixels", summary.outliers);
//! ```

mod astro_image;
pub mod calibration;
pub mod catalog;
pub mod config;
pub mod discovery;
mod error;
pub mod master_frame;
mod report;

// ============================================================================
// Core image types
// ============================================================================

pub use astro_image::{
    format_number, AstroImage, FitsHeaders, Header, HeaderSource, HeaderValue, ImageDimensions,
    ImageError, PIPELINE_KEYWORDS,
};
pub use error::{Error, Result};
pub use report::{BatchReport, FileReport, Outcome};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    CalibrationConfig, CalibrationStep, CatalogConfig, FrameKeys, MasterFrameConfig,
    PipelineConfig, StepSuffixes, DEFAULT_OUTLIER_THRESHOLD,
};

// ============================================================================
// Master frames
// ============================================================================

pub use master_frame::{
    build_master, count_outliers, mean_combine, MasterFrameSummary, MeanAccumulator,
};

// ============================================================================
// Catalog
// ============================================================================

pub use catalog::{build_catalog, parse_filenumber, write_catalog, CatalogRow, CATALOG_HEADER};

// ============================================================================
// Calibration
// ============================================================================

pub use calibration::{
    calibrate, clean_ancillary, ArithmeticOp, CalibrationRun, CalibrationStore, Calibrator,
    FitsArithmetic, ImageArithmetic, ObservingNight, Operand,
};
