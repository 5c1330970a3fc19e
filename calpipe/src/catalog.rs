//! Plain-text observation catalog, one row per frame.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::astro_image::{Header, HeaderSource};
use crate::config::CatalogConfig;
use crate::discovery::{exposure_time, fits_files};
use crate::error::{Error, Result};
use crate::report::BatchReport;

pub const CATALOG_HEADER: &str = "Filenumber,       Integ. Time,      AirMass,     Focus,   Time Taken,               Object and Filter,     Comments";

/// Site filenames look like `YYMMDD####.fits`; the sequence number sits here.
const FILENUMBER_RANGE: std::ops::Range<usize> = 6..10;

/// Extract the four-digit sequence number from a site filename.
pub fn parse_filenumber(file_name: &str) -> Result<String> {
    let malformed = |reason: &str| Error::MalformedFilename {
        name: file_name.to_string(),
        reason: reason.to_string(),
    };

    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() < FILENUMBER_RANGE.end {
        return Err(malformed("expected at least 10 characters (YYMMDD####)"));
    }
    let digits = &chars[FILENUMBER_RANGE];
    if !digits.iter().all(char::is_ascii_digit) {
        return Err(malformed("characters 7-10 must be digits"));
    }
    Ok(digits.iter().collect())
}

/// One catalog line. Empty strings stand for values missing from the header.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub filenumber: String,
    pub exposure: Option<f64>,
    pub airmass: String,
    pub focus: String,
    pub time_taken: String,
    pub object: String,
}

impl CatalogRow {
    /// Build a row from a frame's file name and header.
    ///
    /// Missing keywords are logged and left empty.
    pub fn from_header(path: &Path, header: &Header, exposure_keys: &[String]) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filenumber = parse_filenumber(&file_name)?;

        let text = |key: &str| {
            header.get_string(key).unwrap_or_else(|| {
                tracing::warn!(path = %path.display(), key, "Keyword missing");
                String::new()
            })
        };

        let exposure = exposure_time(header, exposure_keys);
        if exposure.is_none() {
            tracing::warn!(path = %path.display(), keys = ?exposure_keys, "Exposure missing");
        }

        Ok(Self {
            filenumber,
            exposure,
            airmass: text("AIRMASS"),
            focus: text("FOCUS"),
            time_taken: text("DATE-OBS"),
            object: text("OBJECT"),
        })
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let exposure = self
            .exposure
            .map(|e| format!("{e:.6}"))
            .unwrap_or_default();
        writeln!(
            out,
            "{},\t\t\t{},  \t\t{},\t\t{},\t{},\t{},",
            self.filenumber, exposure, self.airmass, self.focus, self.time_taken, self.object
        )
    }
}

/// Write the header line followed by one line per row.
pub fn write_catalog(rows: &[CatalogRow], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{CATALOG_HEADER}")?;
    for row in rows {
        row.write_to(out)?;
    }
    Ok(())
}

/// Scan `config.input_dir` and write the catalog to `config.output`.
///
/// Frames whose header cannot be read or whose name does not carry a
/// filenumber are reported as failures and left out of the table.
pub fn build_catalog(
    config: &CatalogConfig,
    headers: &impl HeaderSource,
) -> Result<BatchReport<CatalogRow>> {
    let files = fits_files(&config.input_dir)?;
    tracing::info!(
        dir = %config.input_dir.display(),
        count = files.len(),
        "Building catalog"
    );

    let mut report = BatchReport::new();
    for path in &files {
        let row = headers
            .read_header(path)
            .map_err(Error::from)
            .and_then(|header| CatalogRow::from_header(path, &header, &config.exposure_keys));
        match row {
            Ok(row) => report.done(path, row),
            Err(e) => report.fail(path, e),
        }
    }

    let rows: Vec<CatalogRow> = report.succeeded().cloned().collect();
    write_catalog_file(&config.output, &rows)?;
    tracing::info!(path = %config.output.display(), rows = rows.len(), "Wrote catalog");

    Ok(report)
}

fn write_catalog_file(path: &Path, rows: &[CatalogRow]) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(write_err)?);
    write_catalog(rows, &mut out).map_err(write_err)?;
    out.flush().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro_image::{AstroImage, FitsHeaders, HeaderValue, ImageDimensions};

    fn keys() -> Vec<String> {
        crate::config::default_exposure_keys()
    }

    #[test]
    fn test_parse_filenumber() {
        assert_eq!(parse_filenumber("1406240012.fits").unwrap(), "0012");
        assert_eq!(parse_filenumber("mar30_0007").unwrap(), "0007");
    }

    #[test]
    fn test_parse_filenumber_rejects_short_and_non_digit_names() {
        assert!(matches!(
            parse_filenumber("dark.fits"),
            Err(Error::MalformedFilename { .. })
        ));
        match parse_filenumber("M42_R_frame.fits") {
            Err(Error::MalformedFilename { name, reason }) => {
                assert_eq!(name, "M42_R_frame.fits");
                assert!(reason.contains("digits"));
            }
            other => panic!("expected malformed filename, got {other:?}"),
        }
    }

    #[test]
    fn test_row_format() {
        let header: Header = [
            ("OBJECT", HeaderValue::Text("M42 R".to_string())),
            ("EXPTIME", HeaderValue::Number(30.0)),
            ("AIRMASS", HeaderValue::Number(1.25)),
            ("FOCUS", HeaderValue::Integer(3120)),
            ("DATE-OBS", HeaderValue::Text("2014-03-31T03:12:44".to_string())),
        ]
        .into_iter()
        .collect();

        let row =
            CatalogRow::from_header(Path::new("/n/1403300042.fits"), &header, &keys()).unwrap();
        let mut out = Vec::new();
        write_catalog(&[row], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CATALOG_HEADER));
        assert_eq!(
            lines.next(),
            Some("0042,\t\t\t30.000000,  \t\t1.25,\t\t3120,\t2014-03-31T03:12:44,\tM42 R,")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_missing_keywords_leave_fields_empty() {
        let header: Header = [("OBJECT", "Flat V")].into_iter().collect();
        let row = CatalogRow::from_header(Path::new("1403300001.fit"), &header, &keys()).unwrap();

        assert_eq!(row.exposure, None);
        assert_eq!(row.airmass, "");
        assert_eq!(row.object, "Flat V");

        let mut out = Vec::new();
        row.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0001,\t\t\t,  \t\t,\t\t,\t,\tFlat V,\n"
        );
    }

    #[test]
    fn test_empty_directory_writes_header_only() {
        let input = tempfile::tempdir().unwrap();
        let output = input.path().join("Prettycatalog.txt");
        let config = CatalogConfig {
            input_dir: input.path().to_path_buf(),
            output: output.clone(),
            ..CatalogConfig::default()
        };

        let report = build_catalog(&config, &FitsHeaders).unwrap();

        assert!(report.is_empty());
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text, format!("{CATALOG_HEADER}\n"));
    }

    #[test]
    fn test_build_catalog_reports_bad_files_and_keeps_going() {
        let input = tempfile::tempdir().unwrap();
        let mut image = AstroImage::filled(ImageDimensions::new(2, 2), 0.0);
        image.header.set("OBJECT", "M42 R");
        image.header.set("EXPTIME", 60.0);
        image.save(input.path().join("1403300003.fits")).unwrap();
        image.save(input.path().join("short.fits")).unwrap();
        std::fs::write(input.path().join("1403300004.fits"), b"not a fits file").unwrap();

        let output = input.path().join("catalog.txt");
        let config = CatalogConfig {
            input_dir: input.path().to_path_buf(),
            output: output.clone(),
            ..CatalogConfig::default()
        };

        let report = build_catalog(&config, &FitsHeaders).unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed_count(), 2);
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("0003,\t\t\t60.000000,"));
    }
}
