//! Locating master calibration frames in the calibration store.
//!
//! The store is laid out as
//!
//! ```text
//! <root>/<YYYYMMDD>/Bias/<YYYYMMDD>mbias.fits
//! <root>/<YYYYMMDD>/Dark/<YYYYMMDD>mdark<exp>.fits   (exp spelled as in the header)
//! <root>/<YYYYMMDD>/Dark/<YYYYMMDD>mdark.fits
//! <root>/<YYYYMMDD>/Flat/<filter>/<YYYYMMDD>mflat<filter>.fits
//! <root>/Standard/...   (same, without the date)
//! ```
//!
//! Each lookup builds an ordered candidate list and takes the first path
//! that exists.

use std::path::{Path, PathBuf};

use super::night::ObservingNight;
use crate::astro_image::HeaderValue;

const STANDARD_DIR: &str = "Standard";

/// One place a calibration frame may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: &'static str,
    pub path: PathBuf,
}

impl Candidate {
    fn new(label: &'static str, path: PathBuf) -> Self {
        Self { label, path }
    }
}

/// Bias candidates: per-night master, then the standard master.
pub fn bias_candidates(root: &Path, night: ObservingNight) -> Vec<Candidate> {
    let date = night.to_string();
    vec![
        Candidate::new(
            "night bias",
            root.join(&date).join("Bias").join(format!("{date}mbias.fits")),
        ),
        Candidate::new(
            "standard bias",
            root.join(STANDARD_DIR).join("Bias").join("mbias.fits"),
        ),
    ]
}

/// Dark candidates, preferring darks taken at the image's exposure over ones
/// that must be scaled.
///
/// The exposure is named as the header stores it: an integer card gives
/// `mdark180.fits`, a real one `mdark180.0.fits`.
pub fn dark_candidates(
    root: &Path,
    night: ObservingNight,
    exposure: &HeaderValue,
) -> Vec<Candidate> {
    let date = night.to_string();
    let exp = exposure.to_string();
    let exp = exp.trim();
    let night_dir = root.join(&date).join("Dark");
    let standard_dir = root.join(STANDARD_DIR).join("Dark");
    vec![
        Candidate::new(
            "night dark at exposure",
            night_dir.join(format!("{date}mdark{exp}.fits")),
        ),
        Candidate::new(
            "standard dark at exposure",
            standard_dir.join(format!("mdark{exp}.fits")),
        ),
        Candidate::new("night dark", night_dir.join(format!("{date}mdark.fits"))),
        Candidate::new("standard dark", standard_dir.join("mdark.fits")),
    ]
}

/// Flat candidates for one filter: per-night, then standard.
pub fn flat_candidates(root: &Path, night: ObservingNight, filter: &str) -> Vec<Candidate> {
    let date = night.to_string();
    vec![
        Candidate::new(
            "night flat",
            root.join(&date)
                .join("Flat")
                .join(filter)
                .join(format!("{date}mflat{filter}.fits")),
        ),
        Candidate::new(
            "standard flat",
            root.join(STANDARD_DIR)
                .join("Flat")
                .join(filter)
                .join(format!("mflat{filter}.fits")),
        ),
    ]
}

/// First candidate whose file exists.
pub fn first_existing(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().find(|c| {
        let exists = c.path.is_file();
        tracing::debug!(label = c.label, path = %c.path.display(), exists, "Calibration candidate");
        exists
    })
}

/// Root of a calibration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationStore {
    root: PathBuf,
}

impl CalibrationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn find_bias(&self, night: ObservingNight) -> Option<PathBuf> {
        first_existing(bias_candidates(&self.root, night)).map(|c| c.path)
    }

    pub fn find_dark(&self, night: ObservingNight, exposure: &HeaderValue) -> Option<PathBuf> {
        first_existing(dark_candidates(&self.root, night, exposure)).map(|c| c.path)
    }

    pub fn find_flat(&self, night: ObservingNight, filter: &str) -> Option<PathBuf> {
        first_existing(flat_candidates(&self.root, night, filter)).map(|c| c.path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;

    use super::*;

    fn night() -> ObservingNight {
        ObservingNight(NaiveDate::from_ymd_opt(2014, 6, 23).unwrap())
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_candidate_order() {
        let root = Path::new("/cal");

        let bias: Vec<PathBuf> = bias_candidates(root, night())
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(
            bias,
            vec![
                PathBuf::from("/cal/20140623/Bias/20140623mbias.fits"),
                PathBuf::from("/cal/Standard/Bias/mbias.fits"),
            ]
        );

        let dark: Vec<PathBuf> = dark_candidates(root, night(), &HeaderValue::Number(180.0))
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(
            dark,
            vec![
                PathBuf::from("/cal/20140623/Dark/20140623mdark180.0.fits"),
                PathBuf::from("/cal/Standard/Dark/mdark180.0.fits"),
                PathBuf::from("/cal/20140623/Dark/20140623mdark.fits"),
                PathBuf::from("/cal/Standard/Dark/mdark.fits"),
            ]
        );

        let flat: Vec<PathBuf> = flat_candidates(root, night(), "V")
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(
            flat,
            vec![
                PathBuf::from("/cal/20140623/Flat/V/20140623mflatV.fits"),
                PathBuf::from("/cal/Standard/Flat/V/mflatV.fits"),
            ]
        );
    }

    #[test]
    fn test_dark_name_follows_header_spelling() {
        let root = Path::new("/cal");
        let name = |exposure: HeaderValue| {
            dark_candidates(root, night(), &exposure)
                .into_iter()
                .map(|c| c.path)
                .take(2)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            name(HeaderValue::Integer(180)),
            vec![
                PathBuf::from("/cal/20140623/Dark/20140623mdark180.fits"),
                PathBuf::from("/cal/Standard/Dark/mdark180.fits"),
            ]
        );
        assert_eq!(
            name(HeaderValue::Number(180.0))[1],
            PathBuf::from("/cal/Standard/Dark/mdark180.0.fits")
        );
        assert_eq!(
            name(HeaderValue::Text("180 ".to_string()))[1],
            PathBuf::from("/cal/Standard/Dark/mdark180.fits")
        );
    }

    #[test]
    fn test_bias_prefers_night_then_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = CalibrationStore::new(dir.path());
        let night_bias = dir.path().join("20140623/Bias/20140623mbias.fits");
        let standard_bias = dir.path().join("Standard/Bias/mbias.fits");

        assert_eq!(store.find_bias(night()), None);

        touch(&night_bias);
        touch(&standard_bias);
        assert_eq!(store.find_bias(night()), Some(night_bias.clone()));

        fs::remove_file(&night_bias).unwrap();
        assert_eq!(store.find_bias(night()), Some(standard_bias));
    }

    #[test]
    fn test_dark_prefers_unscaled() {
        let dir = tempfile::tempdir().unwrap();
        let store = CalibrationStore::new(dir.path());
        let thirty = HeaderValue::Number(30.0);
        let scaled_night = dir.path().join("20140623/Dark/20140623mdark.fits");
        let unscaled_standard = dir.path().join("Standard/Dark/mdark30.0.fits");
        let scaled_standard = dir.path().join("Standard/Dark/mdark.fits");

        touch(&scaled_standard);
        assert_eq!(store.find_dark(night(), &thirty), Some(scaled_standard.clone()));

        touch(&scaled_night);
        assert_eq!(store.find_dark(night(), &thirty), Some(scaled_night.clone()));

        touch(&unscaled_standard);
        assert_eq!(store.find_dark(night(), &thirty), Some(unscaled_standard));

        // A different exposure still falls through to the scalable night dark.
        assert_eq!(store.find_dark(night(), &HeaderValue::Number(60.0)), Some(scaled_night));
    }

    #[test]
    fn test_integer_exposure_finds_integer_named_dark() {
        let dir = tempfile::tempdir().unwrap();
        let store = CalibrationStore::new(dir.path());
        let dark = dir.path().join("Standard/Dark/mdark180.fits");
        touch(&dark);
        touch(&dir.path().join("Standard/Dark/mdark.fits"));

        assert_eq!(store.find_dark(night(), &HeaderValue::Integer(180)), Some(dark));
    }

    #[test]
    fn test_flat_is_per_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = CalibrationStore::new(dir.path());
        touch(&dir.path().join("Standard/Flat/R/mflatR.fits"));

        assert_eq!(
            store.find_flat(night(), "R"),
            Some(dir.path().join("Standard/Flat/R/mflatR.fits"))
        );
        assert_eq!(store.find_flat(night(), "V"), None);
    }

    #[test]
    fn test_directory_is_not_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Standard/Bias/mbias.fits")).unwrap();
        assert_eq!(CalibrationStore::new(dir.path()).find_bias(night()), None);
    }
}
