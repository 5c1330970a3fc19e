mod error;
mod fits;
mod header;

pub use error::ImageError;
pub use fits::PIPELINE_KEYWORDS;
pub use header::{format_number, Header, HeaderValue};

use std::path::Path;

use common::file_utils::{has_extension, FITS_EXTENSIONS};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageDimensions {
    /// Image width in pixels (NAXIS1)
    pub width: usize,
    /// Image height in pixels (NAXIS2)
    pub height: usize,
}

impl ImageDimensions {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0, "Width must be positive");
        assert!(height > 0, "Height must be positive");
        Self { width, height }
    }

    /// Total number of pixel values (width * height).
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// A single-plane image loaded from the primary HDU of a FITS file.
#[derive(Debug, Clone, PartialEq)]
pub struct AstroImage {
    /// Pipeline keywords from the FITS header
    pub header: Header,
    /// Row-major pixel data, `y * width + x`
    pub pixels: Vec<f64>,
    /// Image dimensions
    pub dimensions: ImageDimensions,
}

impl AstroImage {
    /// Create an image with an empty header.
    pub fn new(dimensions: ImageDimensions, pixels: Vec<f64>) -> Self {
        assert_eq!(
            pixels.len(),
            dimensions.pixel_count(),
            "pixels length must equal width * height"
        );
        Self {
            header: Header::new(),
            pixels,
            dimensions,
        }
    }

    /// Create an image filled with a constant value.
    pub fn filled(dimensions: ImageDimensions, value: f64) -> Self {
        Self::new(dimensions, vec![value; dimensions.pixel_count()])
    }

    /// Load an image from a FITS file (`.fits`, `.fit`, `.fts`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        check_extension(path)?;
        fits::load_fits(path)
    }

    /// Write the image to a FITS file, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        fits::save_fits(path.as_ref(), self)
    }

    /// Write the image under the full primary header of `template`: every
    /// card except the data-layout ones is copied verbatim, then this image's
    /// own header entries replace cards with the same keyword.
    pub fn save_with_header_of<P: AsRef<Path>>(
        &self,
        path: P,
        template: &Path,
    ) -> Result<(), ImageError> {
        fits::save_fits_with_cards_of(path.as_ref(), self, template)
    }

    /// Get pixel value at (x, y).
    pub fn get_pixel(&self, x: usize, y: usize) -> f64 {
        debug_assert!(x < self.dimensions.width, "x coordinate out of bounds");
        debug_assert!(y < self.dimensions.height, "y coordinate out of bounds");
        self.pixels[y * self.dimensions.width + x]
    }

    pub fn pixel_count(&self) -> usize {
        self.dimensions.pixel_count()
    }
}

fn check_extension(path: &Path) -> Result<(), ImageError> {
    if has_extension(path, FITS_EXTENSIONS) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedFormat {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }
}

/// Source of FITS header metadata.
///
/// Batch operations read headers through this seam so they can be exercised
/// without real files.
pub trait HeaderSource {
    fn read_header(&self, path: &Path) -> Result<Header, ImageError>;
}

/// Reads headers from FITS files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsHeaders;

impl HeaderSource for FitsHeaders {
    fn read_header(&self, path: &Path) -> Result<Header, ImageError> {
        check_extension(path)?;
        fits::read_header(path)
    }
}

/// Rewrite one header keyword of a FITS file in place, leaving the pixels and
/// all other cards untouched.
pub fn update_keyword(path: &Path, key: &str, value: &HeaderValue) -> Result<(), ImageError> {
    check_extension(path)?;
    fits::update_key(path, key, value)
}
