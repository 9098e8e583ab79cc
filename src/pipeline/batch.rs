//! Directory batch processing with per-document failure isolation.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::Pipeline;
use crate::error::{Error, Result};
use crate::ingest::ExtractorRegistry;
use crate::render::{is_outline_file, write_outline};

/// A document whose outline was written.
#[derive(Debug, Clone)]
pub struct BatchSuccess {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Number of outline entries written
    pub headings: usize,
}

/// A document that could not be processed.
#[derive(Debug)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: Error,
}

/// Outcome of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Total number of documents attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Files in `dir` with an extension `registry` supports, sorted by path.
///
/// Previously written outline files are skipped so an output directory can
/// double as the input directory.
pub fn list_inputs(dir: &Path, registry: &ExtractorRegistry) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && registry.supports_path(&path) && !is_outline_file(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

impl Pipeline {
    /// Process one document and write its outline into `out_dir`.
    pub fn process_to_dir(&self, input: &Path, out_dir: &Path) -> Result<BatchSuccess> {
        let report = self.process_file(input)?;
        let output = write_outline(&report.outline, input, out_dir, self.options.json_format)?;
        Ok(BatchSuccess {
            input: input.to_path_buf(),
            output,
            headings: report.outline.outline.len(),
        })
    }

    /// Process `inputs`, writing outlines into `out_dir`.
    ///
    /// A failing document is recorded and the rest continue; a panic while
    /// processing one is recorded as [`Error::Internal`]. `on_done` is
    /// called once per document as it finishes, possibly from several
    /// threads.
    pub fn process_batch<F>(&self, inputs: &[PathBuf], out_dir: &Path, on_done: F) -> Result<BatchReport>
    where
        F: Fn(&Path, Option<&Error>) + Sync,
    {
        fs::create_dir_all(out_dir)?;

        let run_one = |input: &PathBuf| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_to_dir(input, out_dir)))
                .unwrap_or_else(|payload| Err(Error::Internal(panic_message(payload.as_ref()))));
            match &result {
                Ok(done) => log::info!("Wrote {}", done.output.display()),
                Err(e) => log::warn!("Failed to process {}: {}", input.display(), e),
            }
            on_done(input, result.as_ref().err());
            (input.clone(), result)
        };

        let results: Vec<(PathBuf, Result<BatchSuccess>)> = if self.options.parallel {
            inputs.par_iter().map(run_one).collect()
        } else {
            inputs.iter().map(run_one).collect()
        };

        let mut report = BatchReport::default();
        for (input, result) in results {
            match result {
                Ok(done) => report.succeeded.push(done),
                Err(error) => report.failed.push(BatchFailure { input, error }),
            }
        }

        log::info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Process every supported document in `input_dir`.
    pub fn process_dir(&self, input_dir: &Path, out_dir: &Path) -> Result<BatchReport> {
        let inputs = list_inputs(input_dir, &self.registry)?;
        log::info!("Found {} documents in {}", inputs.len(), input_dir.display());
        self.process_batch(&inputs, out_dir, |_, _| {})
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
