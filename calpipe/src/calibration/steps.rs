use std::path::{Path, PathBuf};

use common::file_utils::derived_path;

use super::arithmetic::{ArithmeticOp, ImageArithmetic, Operand};
use super::night::ObservingNight;
use super::resolver::CalibrationStore;
use crate::astro_image::{Header, HeaderValue, ImageError};
use crate::config::{CalibrationConfig, CalibrationStep, FrameKeys, StepSuffixes};
use crate::error::Error;
use crate::report::BatchReport;

/// Suffix of the per-image scaled dark written during dark subtraction.
pub const SCALED_DARK_SUFFIX: &str = "_tmpdark";

/// Why one image did not produce an output.
#[derive(Debug)]
enum Miss {
    Skip(String),
    Fail(String),
}

impl From<ImageError> for Miss {
    fn from(e: ImageError) -> Self {
        Miss::Fail(e.to_string())
    }
}

impl From<Error> for Miss {
    fn from(e: Error) -> Self {
        Miss::Fail(e.to_string())
    }
}

fn record(report: &mut BatchReport<PathBuf>, image: &Path, result: Result<PathBuf, Miss>) {
    match result {
        Ok(out) => report.done(image, out),
        Err(Miss::Skip(reason)) => report.skip(image, reason),
        Err(Miss::Fail(reason)) => report.fail(image, reason),
    }
}

/// Applies calibration steps to lists of images.
///
/// Every step writes `<stem><suffix>.fits` next to its input and reports one
/// outcome per input image, in order.
pub struct Calibrator<'a, A> {
    arith: &'a A,
    store: CalibrationStore,
    keys: FrameKeys,
    suffixes: StepSuffixes,
}

impl<'a, A: ImageArithmetic> Calibrator<'a, A> {
    pub fn new(config: &CalibrationConfig, arith: &'a A) -> Self {
        Self {
            arith,
            store: CalibrationStore::new(&config.cal_root),
            keys: config.keys.clone(),
            suffixes: config.suffixes.clone(),
        }
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn run_step(&self, step: CalibrationStep, images: &[PathBuf]) -> BatchReport<PathBuf> {
        tracing::info!(%step, count = images.len(), "Running calibration step");
        let report = match step {
            CalibrationStep::Bias => self.bias_subtract(images),
            CalibrationStep::Dark => self.dark_subtract(images),
            CalibrationStep::Flat => self.flat_field(images),
            CalibrationStep::Normalize => self.normalize_exposure(images),
        };
        tracing::info!(%step, "{report}");
        report
    }

    /// Subtract the night's master bias, or the standard one.
    pub fn bias_subtract(&self, images: &[PathBuf]) -> BatchReport<PathBuf> {
        self.each(images, |image| self.bias_one(image))
    }

    /// Subtract a dark, scaled to the image's exposure when no dark at that
    /// exposure is available.
    pub fn dark_subtract(&self, images: &[PathBuf]) -> BatchReport<PathBuf> {
        self.each(images, |image| self.dark_one(image))
    }

    /// Divide by the master flat for the image's filter.
    pub fn flat_field(&self, images: &[PathBuf]) -> BatchReport<PathBuf> {
        self.each(images, |image| self.flat_one(image))
    }

    /// Divide each image by its own exposure time and relabel it as a
    /// one-second exposure.
    pub fn normalize_exposure(&self, images: &[PathBuf]) -> BatchReport<PathBuf> {
        self.each(images, |image| self.normalize_one(image))
    }

    fn each(
        &self,
        images: &[PathBuf],
        mut f: impl FnMut(&Path) -> Result<PathBuf, Miss>,
    ) -> BatchReport<PathBuf> {
        let mut report = BatchReport::new();
        for image in images {
            record(&mut report, image, f(image));
        }
        report
    }

    fn output_path(&self, image: &Path, step: CalibrationStep) -> PathBuf {
        derived_path(image, self.suffixes.for_step(step), "fits")
    }

    fn night(&self, header: &Header) -> Result<ObservingNight, Miss> {
        let timestamp = header
            .get_string(&self.keys.date)
            .ok_or_else(|| Miss::Fail(format!("no {} keyword", self.keys.date)))?;
        Ok(ObservingNight::from_timestamp(&timestamp)?)
    }

    /// Exposure as stored in the header, plus its numeric value.
    fn exposure<'h>(
        &self,
        header: &'h Header,
        path: &Path,
    ) -> Result<(&'h HeaderValue, f64), Miss> {
        header
            .first_numeric(&self.keys.exposure)
            .and_then(|(_, value)| Some((value, value.as_f64()?)))
            .ok_or_else(|| {
                Miss::Fail(format!(
                    "no exposure keyword among {:?} in '{}'",
                    self.keys.exposure,
                    path.display()
                ))
            })
    }

    fn bias_one(&self, image: &Path) -> Result<PathBuf, Miss> {
        let header = self.arith.read_header(image)?;
        let night = self.night(&header)?;
        let bias = self
            .store
            .find_bias(night)
            .ok_or_else(|| Miss::Skip(format!("No bias frame found for night {night}")))?;

        let out = self.output_path(image, CalibrationStep::Bias);
        tracing::info!("{} - {}", image.display(), bias.display());
        self.arith
            .apply(image, ArithmeticOp::Subtract, Operand::Image(&bias), &out)?;
        Ok(out)
    }

    fn dark_one(&self, image: &Path) -> Result<PathBuf, Miss> {
        let header = self.arith.read_header(image)?;
        let night = self.night(&header)?;
        let (exposure_value, exposure) = self.exposure(&header, image)?;
        let dark = self
            .store
            .find_dark(night, exposure_value)
            .ok_or_else(|| {
                Miss::Skip(format!("No dark frame found for night {night} at {exposure}s"))
            })?;
        let (_, dark_exposure) = self.exposure(&self.arith.read_header(&dark)?, &dark)?;

        let out = self.output_path(image, CalibrationStep::Dark);
        if dark_exposure == exposure {
            tracing::info!("{} - {}", image.display(), dark.display());
            self.arith
                .apply(image, ArithmeticOp::Subtract, Operand::Image(&dark), &out)?;
            return Ok(out);
        }

        if dark_exposure == 0.0 {
            return Err(Miss::Fail(format!(
                "dark '{}' has zero exposure and cannot be scaled",
                dark.display()
            )));
        }

        let scale = exposure / dark_exposure;
        let scaled_dark = derived_path(image, SCALED_DARK_SUFFIX, "fits");
        tracing::info!("{} - {} * {scale}", image.display(), dark.display());
        let result = self
            .arith
            .apply(&dark, ArithmeticOp::Multiply, Operand::Scalar(scale), &scaled_dark)
            .and_then(|()| {
                self.arith.apply(
                    image,
                    ArithmeticOp::Subtract,
                    Operand::Image(&scaled_dark),
                    &out,
                )
            });
        remove_scaled_dark(&scaled_dark);
        result?;
        Ok(out)
    }

    fn flat_one(&self, image: &Path) -> Result<PathBuf, Miss> {
        let header = self.arith.read_header(image)?;
        let night = self.night(&header)?;
        let filter = header
            .get_string(&self.keys.filter)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Miss::Fail(format!("no {} keyword", self.keys.filter)))?;
        let flat = self
            .store
            .find_flat(night, &filter)
            .ok_or_else(|| Miss::Skip(format!("No flat found for {}", image.display())))?;

        let out = self.output_path(image, CalibrationStep::Flat);
        tracing::info!("{} / {}", image.display(), flat.display());
        self.arith
            .apply(image, ArithmeticOp::Divide, Operand::Image(&flat), &out)?;
        Ok(out)
    }

    fn normalize_one(&self, image: &Path) -> Result<PathBuf, Miss> {
        let header = self.arith.read_header(image)?;
        let (key, exposure) = header.first_number(&self.keys.exposure).ok_or_else(|| {
            Miss::Fail(format!("no exposure keyword among {:?}", self.keys.exposure))
        })?;
        if exposure == 0.0 {
            return Err(Miss::Fail("exposure time is zero".to_string()));
        }

        let out = self.output_path(image, CalibrationStep::Normalize);
        tracing::info!("{} / {exposure}", image.display());
        self.arith
            .apply(image, ArithmeticOp::Divide, Operand::Scalar(exposure), &out)?;
        self.arith.set_keyword(&out, key, HeaderValue::Integer(1))?;
        Ok(out)
    }
}

fn remove_scaled_dark(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scaled dark");
        }
    }
}
