//! Pipeline configuration.
//!
//! Every tunable value the batch operations need lives here. Configs load from
//! YAML or JSON; any omitted field takes its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default brightness threshold for outlier counting, in ADU.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 10000.0;

/// Default exposure keywords, tried in order.
pub fn default_exposure_keys() -> Vec<String> {
    vec!["EXPTIME".to_string(), "EXPOSURE".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub master: MasterFrameConfig,
    pub catalog: CatalogConfig,
    pub calibration: CalibrationConfig,
}

impl PipelineConfig {
    /// Load a config file; the format follows the extension (`.yaml`, `.yml`, `.json`).
    pub fn load(path: &Path) -> Result<Self> {
        let format = common::FileFormat::from_file_name(&path.to_string_lossy()).map_err(|e| {
            Error::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        common::deserialize(&text, format).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: std::error::Error::source(&e)
                .map_or_else(|| e.to_string(), |source| format!("{e}: {source}")),
        })
    }

    /// Write the config in the format its extension names.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = common::FileFormat::from_file_name(&path.to_string_lossy()).map_err(|e| {
            Error::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        let text = common::serialize(self, format).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Settings for building a master frame from same-exposure frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MasterFrameConfig {
    /// Directory scanned for input frames
    pub input_dir: PathBuf,
    /// Directory the master frame is written to
    pub output_dir: PathBuf,
    /// File name of the master frame
    pub output_name: String,
    /// Exposure time frames must have to be combined, in seconds
    pub target_exposure: f64,
    /// Allowed absolute difference from `target_exposure`; 0 means exact equality
    pub exposure_tolerance: f64,
    /// Pixels at or above this value are counted as outliers
    pub outlier_threshold: f64,
    /// Header keywords holding the exposure time, tried in order
    pub exposure_keys: Vec<String>,
}

impl Default for MasterFrameConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            output_name: "MasterDark.fits".to_string(),
            target_exposure: 180.0,
            exposure_tolerance: 0.0,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            exposure_keys: default_exposure_keys(),
        }
    }
}

impl MasterFrameConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

/// Settings for the observation catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Directory scanned for frames
    pub input_dir: PathBuf,
    /// Catalog file to write
    pub output: PathBuf,
    /// Header keywords holding the exposure time, tried in order
    pub exposure_keys: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output: PathBuf::from("Prettycatalog.txt"),
            exposure_keys: default_exposure_keys(),
        }
    }
}

/// One arithmetic calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationStep {
    Bias,
    Dark,
    Flat,
    Normalize,
}

impl std::fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CalibrationStep::Bias => "bias subtraction",
            CalibrationStep::Dark => "dark subtraction",
            CalibrationStep::Flat => "flat fielding",
            CalibrationStep::Normalize => "exposure normalization",
        };
        f.write_str(name)
    }
}

/// File name suffixes appended to each step's outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepSuffixes {
    pub bias: String,
    pub dark: String,
    pub flat: String,
    pub normalize: String,
}

impl Default for StepSuffixes {
    fn default() -> Self {
        Self {
            bias: "_b".to_string(),
            dark: "_d".to_string(),
            flat: "_f".to_string(),
            normalize: "_n".to_string(),
        }
    }
}

impl StepSuffixes {
    pub fn for_step(&self, step: CalibrationStep) -> &str {
        match step {
            CalibrationStep::Bias => &self.bias,
            CalibrationStep::Dark => &self.dark,
            CalibrationStep::Flat => &self.flat,
            CalibrationStep::Normalize => &self.normalize,
        }
    }
}

/// Header keywords the calibration steps consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameKeys {
    /// Exposure time keywords, tried in order
    pub exposure: Vec<String>,
    /// Observation timestamp keyword
    pub date: String,
    /// Filter name keyword
    pub filter: String,
}

impl Default for FrameKeys {
    fn default() -> Self {
        Self {
            exposure: default_exposure_keys(),
            date: "DATE-OBS".to_string(),
            filter: "FILTER".to_string(),
        }
    }
}

/// Settings for calibrating science frames against a calibration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Directory of science frames to calibrate
    pub image_dir: PathBuf,
    /// Root of the calibration store (`<root>/<YYYYMMDD>/...`, `<root>/Standard/...`)
    pub cal_root: PathBuf,
    /// Steps applied in order, each consuming the previous step's outputs
    pub steps: Vec<CalibrationStep>,
    pub suffixes: StepSuffixes,
    pub keys: FrameKeys,
    /// Keep outputs of intermediate steps instead of deleting them
    pub keep_intermediates: bool,
    /// Replace spaces in input file names with underscores before processing
    pub fix_filenames: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            cal_root: PathBuf::from("."),
            steps: vec![
                CalibrationStep::Bias,
                CalibrationStep::Dark,
                CalibrationStep::Flat,
                CalibrationStep::Normalize,
            ],
            suffixes: StepSuffixes::default(),
            keys: FrameKeys::default(),
            keep_intermediates: false,
            fix_filenames: false,
        }
    }
}
