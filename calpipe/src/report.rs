//! Per-file outcomes of a batch operation.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Processed successfully.
    Done(T),
    /// Deliberately not processed, e.g. no calibration frame was found.
    Skipped(String),
    /// Processing was attempted and failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport<T> {
    pub path: PathBuf,
    pub outcome: Outcome<T>,
}

/// Ordered per-file results of a batch, one entry per input file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    pub files: Vec<FileReport<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self { files: Vec::new() }
    }
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&mut self, path: &Path, value: T) {
        self.push(path, Outcome::Done(value));
    }

    pub fn skip(&mut self, path: &Path, reason: impl fmt::Display) {
        let reason = reason.to_string();
        tracing::warn!(path = %path.display(), %reason, "Skipped");
        self.push(path, Outcome::Skipped(reason));
    }

    pub fn fail(&mut self, path: &Path, reason: impl fmt::Display) {
        let reason = reason.to_string();
        tracing::warn!(path = %path.display(), %reason, "Failed");
        self.push(path, Outcome::Failed(reason));
    }

    fn push(&mut self, path: &Path, outcome: Outcome<T>) {
        self.files.push(FileReport {
            path: path.to_path_buf(),
            outcome,
        });
    }

    /// Values of successfully processed files, in input order.
    pub fn succeeded(&self) -> impl Iterator<Item = &T> {
        self.files.iter().filter_map(|f| match &f.outcome {
            Outcome::Done(v) => Some(v),
            _ => None,
        })
    }

    /// Input paths of successfully processed files, in input order.
    pub fn succeeded_inputs(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Done(_)))
            .map(|f| f.path.as_path())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileReport<T>> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport<T>> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Failed(_)))
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// No input files at all, as opposed to inputs that all failed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn into_succeeded(self) -> Vec<T> {
        self.files
            .into_iter()
            .filter_map(|f| match f.outcome {
                Outcome::Done(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl<T> fmt::Display for BatchReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} done, {} skipped, {} failed",
            self.len(),
            self.succeeded_count(),
            self.skipped_count(),
            self.failed_count()
        )
    }
}
