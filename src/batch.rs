//! Measures every photograph in a folder and writes a CSV table.
//!
//! ```no_run
//! # fn demo(detector: fwhr::FaceLandmarker) -> fwhr::Result<()> {
//! use fwhr::{BatchJob, FwhrEstimator};
//!
//! let mut estimator = FwhrEstimator::new(detector);
//! let report = BatchJob::new("./images", "ratio")?.run(&mut estimator)?;
//! println!("wrote {}", report.output.display());
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detector::LandmarkDetector;
use crate::error::{Error, Result};
use crate::estimator::FwhrEstimator;
use crate::geometry::BoxOptions;
use crate::source::ImageSource;

pub const OUTPUT_FILE_NAME: &str = "fwhr_ratios.csv";

const IMAGE_SUFFIXES: [&str; 2] = [".jpg", ".png"];

const CSV_HEADER: [&str; 2] = ["Filename", "Ratio"];

/// Row order of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// File name, lexical ascending.
    #[default]
    Filename,
    /// Ratio ascending; images without a ratio go last.
    Ratio,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "filename" => Ok(SortKey::Filename),
            "ratio" => Ok(SortKey::Ratio),
            other => Err(Error::InvalidArgument(format!(
                "invalid value for sort_by: {:?}, accepted values are \"filename\" and \"ratio\"",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Filename => f.write_str("filename"),
            SortKey::Ratio => f.write_str("ratio"),
        }
    }
}

/// What to do when one image cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure; no table is written.
    #[default]
    Abort,
    /// Record the image with an empty ratio and carry on.
    Continue,
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Ratio")]
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub filename: String,
    pub message: String,
}

#[derive(Debug)]
pub struct BatchReport {
    /// Rows in output order.
    pub records: Vec<BatchRecord>,
    /// Images skipped under [`FailurePolicy::Continue`].
    pub failures: Vec<BatchFailure>,
    pub output: PathBuf,
}

/// A configured run over one folder.
#[derive(Debug, Clone)]
pub struct BatchJob {
    folder: PathBuf,
    sort_key: SortKey,
    policy: FailurePolicy,
}

impl BatchJob {
    /// Fails with [`Error::InvalidArgument`] for an unknown `sort_by`.
    pub fn new<P: Into<PathBuf>>(folder: P, sort_by: &str) -> Result<Self> {
        Ok(Self::with_sort_key(folder, sort_by.parse()?))
    }

    pub fn with_sort_key<P: Into<PathBuf>>(folder: P, sort_key: SortKey) -> Self {
        Self {
            folder: folder.into(),
            sort_key,
            policy: FailurePolicy::default(),
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.folder.join(OUTPUT_FILE_NAME)
    }

    /// Measure every `.jpg` and `.png` file in the folder, then write the table.
    ///
    /// Boxes always use the average method with the eyelid top line.
    pub fn run<D: LandmarkDetector>(&self, estimator: &mut FwhrEstimator<D>) -> Result<BatchReport> {
        let options = BoxOptions::default();
        let files = image_files(&self.folder)?;
        log::info!(
            "processing {} image(s) in {}",
            files.len(),
            self.folder.display()
        );

        let mut records = Vec::with_capacity(files.len());
        let mut failures = Vec::new();

        for name in files {
            let source = ImageSource::Path(self.folder.join(&name));
            let filename = name.to_string_lossy().into_owned();
            let ratio = match estimator.estimate(&source, &options) {
                Ok(estimate) => estimate.ratio,
                Err(e) if self.policy == FailurePolicy::Continue => {
                    log::warn!("skipping {}: {}", filename, e);
                    failures.push(BatchFailure {
                        filename: filename.clone(),
                        message: e.to_string(),
                    });
                    None
                }
                Err(e) => return Err(e),
            };
            records.push(BatchRecord { filename, ratio });
        }

        sort_records(&mut records, self.sort_key);

        let output = self.output_path();
        write_csv(&output, &records)?;
        log::info!("wrote {} row(s) to {}", records.len(), output.display());

        Ok(BatchReport {
            records,
            failures,
            output,
        })
    }
}

/// Names of the files in `folder` ending in `.jpg` or `.png`, sorted.
///
/// Symlinks count when they point at a file. Names are kept as the OS
/// returns them so non UTF-8 names can still be opened.
fn image_files(folder: &Path) -> Result<Vec<OsString>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name();
        if !IMAGE_SUFFIXES
            .iter()
            .any(|s| name.to_string_lossy().ends_with(s))
        {
            continue;
        }
        if entry.path().is_file() {
            files.push(name);
        } else {
            log::debug!("skipping {}, not a file", entry.path().display());
        }
    }
    files.sort();
    Ok(files)
}

/// Sort in place. Ties and missing ratios fall back to file name order.
pub fn sort_records(records: &mut [BatchRecord], key: SortKey) {
    records.sort_by(|a, b| a.filename.cmp(&b.filename));
    if key == SortKey::Ratio {
        records.sort_by(|a, b| match (a.ratio, b.ratio) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

/// Write the `Filename,Ratio` table. Missing ratios are empty fields.
///
/// The header row is written even when there are no records.
pub fn write_csv(path: &Path, records: &[BatchRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
