//! Master calibration frames: pixel-wise mean of same-exposure frames.

use std::path::PathBuf;

use crate::astro_image::{AstroImage, HeaderSource, ImageDimensions};
use crate::config::MasterFrameConfig;
use crate::discovery::{fits_files, select_by_exposure};
use crate::error::{Error, Result};
use crate::report::BatchReport;

/// Running sum for a pixel-wise mean.
///
/// Frames are added one at a time so only the sum is held in memory.
#[derive(Debug, Default)]
pub struct MeanAccumulator {
    sum: Vec<f64>,
    dimensions: Option<ImageDimensions>,
    count: usize,
}

impl MeanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame. The first frame fixes the expected dimensions.
    pub fn add(&mut self, frame: &AstroImage) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != frame.dimensions => {
                return Err(Error::DimensionMismatch {
                    index: self.count,
                    expected,
                    actual: frame.dimensions,
                });
            }
            Some(_) => {}
            None => {
                self.dimensions = Some(frame.dimensions);
                self.sum = vec![0.0; frame.pixel_count()];
            }
        }

        self.sum
            .iter_mut()
            .zip(&frame.pixels)
            .for_each(|(s, p)| *s += p);
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Divide the sum by the number of frames added.
    pub fn finish(self) -> Result<AstroImage> {
        let Some(dimensions) = self.dimensions else {
            return Err(Error::NoFrames);
        };
        let n = self.count as f64;
        let pixels = self.sum.into_iter().map(|s| s / n).collect();
        Ok(AstroImage::new(dimensions, pixels))
    }
}

/// Pixel-wise arithmetic mean of same-shape frames.
///
/// The result carries no header keywords.
pub fn mean_combine(frames: &[AstroImage]) -> Result<AstroImage> {
    let mut acc = MeanAccumulator::new();
    for frame in frames {
        acc.add(frame)?;
    }
    acc.finish()
}

/// Number of pixels with a value at or above `threshold`.
pub fn count_outliers(pixels: &[f64], threshold: f64) -> usize {
    pixels.iter().filter(|&&p| p >= threshold).count()
}

/// What [`build_master`] produced.
#[derive(Debug, Clone)]
pub struct MasterFrameSummary {
    /// Frames combined into the master, in directory order
    pub inputs: Vec<PathBuf>,
    /// Header scan of every FITS file in the input directory
    pub scanned: BatchReport<f64>,
    pub dimensions: ImageDimensions,
    /// Pixels at or above the configured threshold
    pub outliers: usize,
    pub output: PathBuf,
}

/// Build a master frame from every frame in `input_dir` with the target exposure.
///
/// Distinguishes an input directory with no FITS files from one where no
/// frame matched the exposure filter; both are errors. A frame that cannot be
/// loaded after passing the header scan, or whose dimensions differ, aborts
/// the build.
pub fn build_master(
    config: &MasterFrameConfig,
    headers: &impl HeaderSource,
) -> Result<MasterFrameSummary> {
    let files = fits_files(&config.input_dir)?;
    if files.is_empty() {
        return Err(Error::NoFitsFiles {
            dir: config.input_dir.clone(),
        });
    }
    tracing::info!(
        dir = %config.input_dir.display(),
        count = files.len(),
        "Scanning FITS files"
    );

    let selection = select_by_exposure(
        &files,
        config.target_exposure,
        config.exposure_tolerance,
        &config.exposure_keys,
        headers,
    );
    if selection.matched.is_empty() {
        return Err(Error::NoMatchingFrames {
            target: config.target_exposure,
            scanned: selection.scanned.len(),
            failed: selection.scanned.failed_count(),
        });
    }
    tracing::info!(
        matched = selection.matched.len(),
        exposure = config.target_exposure,
        "Combining frames"
    );

    let mut acc = MeanAccumulator::new();
    for path in &selection.matched {
        let frame = AstroImage::from_file(path)?;
        acc.add(&frame)?;
    }
    let master = acc.finish()?;

    let outliers = count_outliers(&master.pixels, config.outlier_threshold);
    tracing::info!(
        outliers,
        threshold = config.outlier_threshold,
        "Outlier pixels in master frame"
    );

    let output = config.output_path();
    master.save(&output)?;
    tracing::info!(path = %output.display(), "Wrote master frame");

    Ok(MasterFrameSummary {
        inputs: selection.matched,
        scanned: selection.scanned,
        dimensions: master.dimensions,
        outliers,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro_image::FitsHeaders;

    fn frame(width: usize, height: usize, pixels: Vec<f64>) -> AstroImage {
        AstroImage::new(ImageDimensions::new(width, height), pixels)
    }

    #[test]
    fn test_mean_combine_elementwise() {
        let frames = vec![
            frame(2, 2, vec![1.0, 2.0, 3.0, 4.0]),
            frame(2, 2, vec![3.0, 2.0, 1.0, 0.0]),
            frame(2, 2, vec![5.0, 5.0, 5.0, 8.0]),
        ];

        let mean = mean_combine(&frames).unwrap();

        assert_eq!(mean.dimensions, ImageDimensions::new(2, 2));
        for p in 0..4 {
            let expected: f64 = frames.iter().map(|f| f.pixels[p]).sum::<f64>() / 3.0;
            assert!(
                (mean.pixels[p] - expected).abs() < 1e-12,
                "pixel {p}: {} != {expected}",
                mean.pixels[p]
            );
        }
        assert!(mean.header.is_empty());
    }

    #[test]
    fn test_mean_combine_single_frame_is_identity() {
        let only = frame(3, 1, vec![7.0, -1.5, 0.0]);
        let mean = mean_combine(std::slice::from_ref(&only)).unwrap();
        assert_eq!(mean.pixels, only.pixels);
    }

    #[test]
    fn test_mean_combine_empty_fails() {
        assert!(matches!(mean_combine(&[]), Err(Error::NoFrames)));
    }

    #[test]
    fn test_mean_combine_dimension_mismatch() {
        let frames = vec![
            frame(2, 2, vec![0.0; 4]),
            frame(2, 2, vec![0.0; 4]),
            frame(4, 1, vec![0.0; 4]),
        ];

        match mean_combine(&frames) {
            Err(Error::DimensionMismatch {
                index,
                expected,
                actual,
            }) => {
                assert_eq!(index, 2);
                assert_eq!(expected, ImageDimensions::new(2, 2));
                assert_eq!(actual, ImageDimensions::new(4, 1));
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_count_outliers_example() {
        // [[5000, 10000], [15000, 9999]] with T = 10000: 10000 and 15000 count.
        let mean = [5000.0, 10000.0, 15000.0, 9999.0];
        assert_eq!(count_outliers(&mean, 10000.0), 2);
    }

    #[test]
    fn test_count_outliers_monotonic_in_threshold() {
        let pixels: Vec<f64> = (0..200).map(|i| (i * 97 % 251) as f64 * 80.0).collect();
        let mut previous = usize::MAX;
        for threshold in (0..25).map(|t| t as f64 * 1000.0) {
            let count = count_outliers(&pixels, threshold);
            assert!(count <= previous, "count rose at threshold {threshold}");
            previous = count;
        }
        assert_eq!(count_outliers(&pixels, f64::INFINITY), 0);
        assert_eq!(count_outliers(&pixels, f64::NEG_INFINITY), pixels.len());
    }

    fn write_frame(dir: &std::path::Path, name: &str, exposure: f64, pixels: Vec<f64>) {
        let mut image = frame(2, 2, pixels);
        image.header.set("EXPOSURE", exposure);
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_build_master_end_to_end() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_frame(input.path(), "d1.fits", 180.0, vec![8000.0, 10000.0, 20000.0, 0.0]);
        write_frame(input.path(), "d2.fit", 180.0, vec![12000.0, 10000.0, 10000.0, 0.0]);
        write_frame(input.path(), "d3.fts", 60.0, vec![1e6; 4]);
        std::fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

        let config = MasterFrameConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            output_name: "MasterDark_180s.fits".to_string(),
            ..MasterFrameConfig::default()
        };

        let summary = build_master(&config, &FitsHeaders).unwrap();

        assert_eq!(summary.inputs.len(), 2);
        assert_eq!(summary.scanned.len(), 3);
        assert_eq!(summary.outliers, 3);
        let master = AstroImage::from_file(&summary.output).unwrap();
        assert_eq!(master.pixels, vec![10000.0, 10000.0, 15000.0, 0.0]);
    }

    #[test]
    fn test_build_master_distinguishes_empty_dir_from_no_match() {
        let input = tempfile::tempdir().unwrap();
        let config = MasterFrameConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: input.path().to_path_buf(),
            ..MasterFrameConfig::default()
        };

        assert!(matches!(
            build_master(&config, &FitsHeaders),
            Err(Error::NoFitsFiles { .. })
        ));

        write_frame(input.path(), "d1.fits", 60.0, vec![0.0; 4]);
        match build_master(&config, &FitsHeaders) {
            Err(Error::NoMatchingFrames {
                target,
                scanned,
                failed,
            }) => {
                assert_eq!(target, 180.0);
                assert_eq!(scanned, 1);
                assert_eq!(failed, 0);
            }
            other => panic!("expected no matching frames, got {other:?}"),
        }
    }
}
