use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;

use fitsio::errors::check_status;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::{sys, FitsFile};

use super::{AstroImage, Header, HeaderValue, ImageDimensions, ImageError};

/// Keywords read into an [`AstroImage`]'s typed header.
///
/// Derived frames keep the rest of their input's header as raw cards
/// through [`AstroImage::save_with_header_of`].
pub const PIPELINE_KEYWORDS: &[&str] = &[
    "OBJECT", "FILTER", "EXPTIME", "EXPOSURE", "DATE-OBS", "AIRMASS", "FOCUS", "IMAGETYP",
    "INSTRUME", "TELESCOP", "CCD-TEMP", "XBINNING", "YBINNING", "GAIN",
];

/// Keywords that describe the data layout. cfitsio writes them for new
/// pixels, so they are never copied from another file.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "BITPIX", "EXTEND", "BSCALE", "BZERO", "BLANK", "CHECKSUM", "DATASUM", "END",
];

fn is_structural(card: &str) -> bool {
    let name = card.get(..8).unwrap_or(card).trim_end();
    name.starts_with("NAXIS") || STRUCTURAL_KEYWORDS.contains(&name)
}

fn fits_err(path: &Path) -> impl FnOnce(fitsio::errors::Error) -> ImageError + '_ {
    move |source| ImageError::Fits {
        path: path.to_path_buf(),
        source,
    }
}

/// Read the pipeline keywords from the primary HDU.
///
/// The file is closed before returning.
pub(super) fn read_header(path: &Path) -> Result<Header, ImageError> {
    let mut fptr = FitsFile::open(path).map_err(fits_err(path))?;
    let hdu = fptr.primary_hdu().map_err(fits_err(path))?;
    Ok(read_keywords(&hdu, &mut fptr))
}

/// Load the primary image of a FITS file as `f64` pixels.
///
/// Pixel values are returned as stored (cfitsio applies BSCALE/BZERO);
/// no normalization is performed.
pub(super) fn load_fits(path: &Path) -> Result<AstroImage, ImageError> {
    let mut fptr = FitsFile::open(path).map_err(fits_err(path))?;
    let hdu = fptr.primary_hdu().map_err(fits_err(path))?;

    let shape = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => shape.clone(),
        _ => {
            return Err(ImageError::NotAnImage {
                path: path.to_path_buf(),
            })
        }
    };

    // fitsio reports shape slowest axis first: [NAXIS2, NAXIS1], or
    // [NAXIS3, NAXIS2, NAXIS1] for cubes. A single-plane cube is accepted.
    let dimensions = match shape.as_slice() {
        [height, width] if *width > 0 && *height > 0 => ImageDimensions::new(*width, *height),
        [1, height, width] if *width > 0 && *height > 0 => ImageDimensions::new(*width, *height),
        _ => {
            return Err(ImageError::UnsupportedShape {
                path: path.to_path_buf(),
                shape: shape.clone(),
            })
        }
    };

    let pixels: Vec<f64> = hdu.read_image(&mut fptr).map_err(fits_err(path))?;
    if pixels.len() != dimensions.pixel_count() {
        return Err(ImageError::PixelCount {
            path: path.to_path_buf(),
            expected: dimensions.pixel_count(),
            actual: pixels.len(),
        });
    }

    let header = read_keywords(&hdu, &mut fptr);

    Ok(AstroImage {
        header,
        pixels,
        dimensions,
    })
}

/// Write an image as the primary HDU of a new FITS file with `f64` pixels.
///
/// An existing file at `path` is replaced. Only the image's own header
/// entries are written beyond the structural keywords cfitsio emits.
pub(super) fn save_fits(path: &Path, image: &AstroImage) -> Result<(), ImageError> {
    write_fits(path, image, &[])
}

/// Like [`save_fits`], but the new file starts with every non-structural
/// card of `template`'s primary HDU, copied verbatim. The image's own header
/// entries then overwrite cards with the same keyword.
pub(super) fn save_fits_with_cards_of(
    path: &Path,
    image: &AstroImage,
    template: &Path,
) -> Result<(), ImageError> {
    let cards = read_cards(template)?;
    write_fits(path, image, &cards)
}

/// Replace one keyword of an existing file's primary HDU in place.
///
/// Pixels and every other card are left as they are.
pub(super) fn update_key(path: &Path, key: &str, value: &HeaderValue) -> Result<(), ImageError> {
    let mut fptr = FitsFile::edit(path).map_err(fits_err(path))?;
    let hdu = fptr.primary_hdu().map_err(fits_err(path))?;
    let key = key.to_ascii_uppercase();
    delete_key(&mut fptr, &key).map_err(fits_err(path))?;
    write_value(&hdu, &mut fptr, &key, value).map_err(fits_err(path))
}

fn write_fits(path: &Path, image: &AstroImage, cards: &[String]) -> Result<(), ImageError> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[image.dimensions.height, image.dimensions.width],
    };

    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .map_err(fits_err(path))?;
    let hdu = fptr.primary_hdu().map_err(fits_err(path))?;
    hdu.write_image(&mut fptr, &image.pixels)
        .map_err(fits_err(path))?;

    // cfitsio opens a new primary HDU with its own COMMENT cards.
    let existing = header_cards(&mut fptr).map_err(fits_err(path))?;
    for card in cards.iter().filter(|card| !existing.contains(*card)) {
        write_card(&mut fptr, card).map_err(fits_err(path))?;
    }

    for (key, value) in image.header.iter() {
        if !cards.is_empty() {
            delete_key(&mut fptr, key).map_err(fits_err(path))?;
        }
        write_value(&hdu, &mut fptr, key, value).map_err(fits_err(path))?;
    }

    Ok(())
}

fn write_value(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    key: &str,
    value: &HeaderValue,
) -> fitsio::errors::Result<()> {
    match value {
        HeaderValue::Integer(v) => hdu.write_key(fptr, key, *v),
        HeaderValue::Number(v) => hdu.write_key(fptr, key, *v),
        HeaderValue::Text(s) => hdu.write_key(fptr, key, s.as_str()),
    }
}

fn read_cards(path: &Path) -> Result<Vec<String>, ImageError> {
    let mut fptr = FitsFile::open(path).map_err(fits_err(path))?;
    fptr.primary_hdu().map_err(fits_err(path))?;
    header_cards(&mut fptr).map_err(fits_err(path))
}

/// Every card of the current HDU except the structural ones, as the raw
/// 80-character records.
fn header_cards(fptr: &mut FitsFile) -> fitsio::errors::Result<Vec<String>> {
    let mut status: c_int = 0;
    let mut count: c_int = 0;
    let mut more: c_int = 0;
    // SAFETY: `fptr` is an open file.
    unsafe {
        sys::ffghsp(fptr.as_raw(), &mut count, &mut more, &mut status);
    }
    check_status(status)?;

    let mut cards = Vec::with_capacity(count.max(0) as usize);
    let mut buffer: [c_char; sys::FLEN_CARD as usize] = [0; sys::FLEN_CARD as usize];
    for index in 1..=count {
        // SAFETY: `buffer` holds FLEN_CARD bytes, the most cfitsio writes
        // for one record including the terminating nul.
        unsafe {
            sys::ffgrec(fptr.as_raw(), index, buffer.as_mut_ptr(), &mut status);
        }
        check_status(status)?;
        // SAFETY: ffgrec succeeded, so `buffer` is nul-terminated.
        let card = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        let card = card.to_string_lossy().into_owned();
        if !is_structural(&card) {
            cards.push(card);
        }
    }
    Ok(cards)
}

fn write_card(fptr: &mut FitsFile, card: &str) -> fitsio::errors::Result<()> {
    let card = CString::new(card)?;
    let mut status: c_int = 0;
    // SAFETY: `fptr` is open read-write and `card` is nul-terminated.
    unsafe {
        sys::ffprec(fptr.as_raw(), card.as_ptr(), &mut status);
    }
    check_status(status)
}

/// Delete a keyword from the current HDU. A missing keyword is not an error.
fn delete_key(fptr: &mut FitsFile, key: &str) -> fitsio::errors::Result<()> {
    let name = CString::new(key)?;
    let mut status: c_int = 0;
    // SAFETY: `fptr` is open read-write and `name` is nul-terminated.
    unsafe {
        sys::ffdkey(fptr.as_raw(), name.as_ptr(), &mut status);
    }
    if status == sys::KEY_NO_EXIST as c_int {
        return Ok(());
    }
    check_status(status)
}

/// Read every pipeline keyword present in the HDU.
///
/// Values are read as their literal card text and classified afterwards, so
/// a filter named `2` stays `2` rather than becoming `2.0`.
fn read_keywords(hdu: &FitsHdu, fptr: &mut FitsFile) -> Header {
    let mut header = Header::new();
    for key in PIPELINE_KEYWORDS {
        if let Some(raw) = read_key_optional::<String>(hdu, fptr, key) {
            header.set(key, HeaderValue::parse_literal(&raw));
        }
    }
    header
}

/// Helper to read an optional key from the FITS header.
fn read_key_optional<T: fitsio::headers::ReadsKey>(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    key: &str,
) -> Option<T> {
    hdu.read_key(fptr, key).ok()
}
