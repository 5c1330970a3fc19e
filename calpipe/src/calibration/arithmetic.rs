use std::fmt;
use std::path::Path;

use crate::astro_image::{
    update_keyword, AstroImage, FitsHeaders, Header, HeaderSource, HeaderValue, ImageError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    /// Apply to one pixel pair. Division by zero yields 0.
    pub fn eval(self, a: f64, b: f64) -> f64 {
        match self {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide if b == 0.0 => 0.0,
            ArithmeticOp::Divide => a / b,
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        };
        f.write_str(symbol)
    }
}

/// Right-hand side of an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    Image(&'a Path),
    Scalar(f64),
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Image(path) => write!(f, "{}", path.display()),
            Operand::Scalar(value) => write!(f, "{value}"),
        }
    }
}

/// Whole-image arithmetic and header editing on files.
///
/// The calibration steps only touch pixels through this trait, so they run
/// against an in-memory implementation in tests.
pub trait ImageArithmetic: HeaderSource {
    /// Write `operand1 op operand2` to `result`, pixel by pixel.
    ///
    /// The result carries `operand1`'s header and replaces any existing file.
    fn apply(
        &self,
        operand1: &Path,
        op: ArithmeticOp,
        operand2: Operand<'_>,
        result: &Path,
    ) -> Result<(), ImageError>;

    /// Rewrite a single header keyword of an existing image.
    fn set_keyword(&self, image: &Path, key: &str, value: HeaderValue) -> Result<(), ImageError>;
}

/// [`ImageArithmetic`] on FITS files through cfitsio.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsArithmetic;

impl HeaderSource for FitsArithmetic {
    fn read_header(&self, path: &Path) -> Result<Header, ImageError> {
        FitsHeaders.read_header(path)
    }
}

impl ImageArithmetic for FitsArithmetic {
    fn apply(
        &self,
        operand1: &Path,
        op: ArithmeticOp,
        operand2: Operand<'_>,
        result: &Path,
    ) -> Result<(), ImageError> {
        let mut image = AstroImage::from_file(operand1)?;
        // The full header is copied from operand1 below.
        image.header = Header::new();
        match operand2 {
            Operand::Scalar(value) => {
                image.pixels.iter_mut().for_each(|p| *p = op.eval(*p, value));
            }
            Operand::Image(path) => {
                let other = AstroImage::from_file(path)?;
                if other.dimensions != image.dimensions {
                    return Err(ImageError::OperandShape {
                        path: path.to_path_buf(),
                        expected: image.dimensions,
                        actual: other.dimensions,
                    });
                }
                image
                    .pixels
                    .iter_mut()
                    .zip(&other.pixels)
                    .for_each(|(p, &q)| *p = op.eval(*p, q));
            }
        }
        image.save_with_header_of(result, operand1)
    }

    fn set_keyword(&self, image: &Path, key: &str, value: HeaderValue) -> Result<(), ImageError> {
        update_keyword(image, key, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro_image::ImageDimensions;

    #[test]
    fn test_eval() {
        assert_eq!(ArithmeticOp::Add.eval(2.0, 3.0), 5.0);
        assert_eq!(ArithmeticOp::Subtract.eval(2.0, 3.0), -1.0);
        assert_eq!(ArithmeticOp::Multiply.eval(2.0, 3.0), 6.0);
        assert_eq!(ArithmeticOp::Divide.eval(3.0, 2.0), 1.5);
        assert_eq!(ArithmeticOp::Divide.eval(3.0, 0.0), 0.0);
    }

    fn write(path: &Path, pixels: Vec<f64>, exposure: f64) {
        let mut image = AstroImage::new(ImageDimensions::new(2, 2), pixels);
        image.header.set("EXPTIME", exposure);
        image.header.set("FILTER", "V");
        image.save(path).unwrap();
    }

    #[test]
    fn test_image_minus_image_keeps_first_header() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        let bias = dir.path().join("bias.fits");
        let out = dir.path().join("science_b.fits");
        write(&science, vec![110.0, 120.0, 130.0, 140.0], 30.0);
        write(&bias, vec![10.0, 10.0, 10.0, 20.0], 0.0);

        FitsArithmetic
            .apply(&science, ArithmeticOp::Subtract, Operand::Image(&bias), &out)
            .unwrap();

        let result = AstroImage::from_file(&out).unwrap();
        assert_eq!(result.pixels, vec![100.0, 110.0, 120.0, 120.0]);
        assert_eq!(result.header.get_f64("EXPTIME"), Some(30.0));
        assert_eq!(result.header.get_string("FILTER").as_deref(), Some("V"));
    }

    /// Add a card outside the pipeline keyword set, as an observatory header would carry.
    fn add_card(path: &Path, key: &str, value: &str) {
        let mut fptr = fitsio::FitsFile::edit(path).unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.write_key(&mut fptr, key, value).unwrap();
    }

    fn read_card(path: &Path, key: &str) -> Option<String> {
        let mut fptr = fitsio::FitsFile::open(path).unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.read_key::<String>(&mut fptr, key).ok()
    }

    #[test]
    fn test_result_carries_every_card_of_first_operand() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        let bias = dir.path().join("bias.fits");
        let out = dir.path().join("science_b.fits");
        write(&science, vec![110.0, 120.0, 130.0, 140.0], 30.0);
        write(&bias, vec![10.0; 4], 0.0);
        add_card(&science, "RA", "05:35:17");
        add_card(&science, "OBSERVER", "night crew");
        add_card(&bias, "BIASONLY", "yes");

        FitsArithmetic
            .apply(&science, ArithmeticOp::Subtract, Operand::Image(&bias), &out)
            .unwrap();
        FitsArithmetic
            .apply(&out, ArithmeticOp::Divide, Operand::Scalar(30.0), &out)
            .unwrap();

        assert_eq!(read_card(&out, "RA").as_deref(), Some("05:35:17"));
        assert_eq!(read_card(&out, "OBSERVER").as_deref(), Some("night crew"));
        assert_eq!(read_card(&out, "BIASONLY"), None);
        let result = AstroImage::from_file(&out).unwrap();
        assert_eq!(result.header.get_f64("EXPTIME"), Some(30.0));
        assert_eq!(result.pixels, vec![10.0 / 3.0, 110.0 / 30.0, 4.0, 130.0 / 30.0]);
    }

    #[test]
    fn test_set_keyword_edits_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        write(&science, vec![1.0, 2.0, 3.0, 4.0], 30.0);
        add_card(&science, "RA", "05:35:17");

        FitsArithmetic
            .set_keyword(&science, "EXPTIME", HeaderValue::Integer(1))
            .unwrap();

        assert_eq!(read_card(&science, "RA").as_deref(), Some("05:35:17"));
        assert_eq!(read_card(&science, "EXPTIME").as_deref(), Some("1"));
        let result = AstroImage::from_file(&science).unwrap();
        assert_eq!(result.pixels, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(result.header.get("EXPTIME"), Some(&HeaderValue::Integer(1)));
        assert_eq!(result.header.get_string("FILTER").as_deref(), Some("V"));
    }

    #[test]
    fn test_divide_by_flat_with_zero_pixel() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        let flat = dir.path().join("flat.fits");
        let out = dir.path().join("science_f.fits");
        write(&science, vec![100.0, 100.0, 100.0, 100.0], 30.0);
        write(&flat, vec![0.5, 1.0, 2.0, 0.0], 1.0);

        FitsArithmetic
            .apply(&science, ArithmeticOp::Divide, Operand::Image(&flat), &out)
            .unwrap();

        let result = AstroImage::from_file(&out).unwrap();
        assert_eq!(result.pixels, vec![200.0, 100.0, 50.0, 0.0]);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        let small = dir.path().join("small.fits");
        write(&science, vec![0.0; 4], 30.0);
        AstroImage::filled(ImageDimensions::new(1, 1), 1.0)
            .save(&small)
            .unwrap();

        let err = FitsArithmetic
            .apply(
                &science,
                ArithmeticOp::Subtract,
                Operand::Image(&small),
                &dir.path().join("out.fits"),
            )
            .unwrap_err();
        assert!(matches!(err, ImageError::OperandShape { .. }));
        assert!(!dir.path().join("out.fits").exists());
    }

    #[test]
    fn test_scalar_and_set_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let science = dir.path().join("science.fits");
        let out = dir.path().join("science_n.fits");
        write(&science, vec![30.0, 60.0, 90.0, 0.0], 30.0);

        FitsArithmetic
            .apply(&science, ArithmeticOp::Divide, Operand::Scalar(30.0), &out)
            .unwrap();
        FitsArithmetic
            .set_keyword(&out, "EXPTIME", HeaderValue::Integer(1))
            .unwrap();

        let result = AstroImage::from_file(&out).unwrap();
        assert_eq!(result.pixels, vec![1.0, 2.0, 3.0, 0.0]);
        assert_eq!(result.header.get_f64("EXPTIME"), Some(1.0));
        assert_eq!(FitsArithmetic.read_header(&science).unwrap().get_f64("EXPTIME"), Some(30.0));
    }
}
