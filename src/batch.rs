use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::extraction::ExtractionPipeline;
use crate::models::{BatchResult, DocumentOutcome, FailedDocument, FailureReason};
use crate::source::DocumentOpener;

/// Subdirectory of the output directory holding diagnostics
pub const MISSING_DIR: &str = "missing";
pub const MISSING_LIST_FILE: &str = "missing_list.txt";

/// Region code of a document file name: the part before the first `.`,
/// then before the first `_`.
pub fn region_code(file_name: &str) -> &str {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.split('_').next().unwrap_or(stem)
}

/// Hands out `{region}_{n}` output names.
///
/// `n` counts documents of the same region in a row and starts again at 1
/// whenever the region changes.
#[derive(Debug, Default)]
pub struct RegionSequencer {
    previous: Option<String>,
    next_id: usize,
}

impl RegionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self, file_name: &str) -> String {
        let region = region_code(file_name);
        if self.previous.as_deref() != Some(region) {
            self.previous = Some(region.to_string());
            self.next_id = 1;
        }
        let name = format!("{}_{}", region, self.next_id);
        self.next_id += 1;
        name
    }
}

/// Runs the extraction over every document in a directory
pub struct BatchRunner<O: DocumentOpener> {
    opener: O,
    pipeline: ExtractionPipeline,
    fail_fast: bool,
}

impl<O: DocumentOpener> BatchRunner<O> {
    pub fn new(opener: O, config: ExtractionConfig) -> Self {
        Self {
            opener,
            pipeline: ExtractionPipeline::new(config),
            fail_fast: false,
        }
    }

    /// Abort on the first document that fails to parse or decode instead of
    /// recording it and moving on
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.pipeline
    }

    /// Process all files below `input_dir` in [`list_documents`] order,
    /// writing images and diagnostics into `output_dir`.
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchResult> {
        fs::create_dir_all(output_dir)?;

        // Listed up front so files written during the run are never picked up.
        let documents = list_documents(input_dir)?;
        info!(count = documents.len(), dir = %input_dir.display(), "Starting batch");

        let mut sequencer = RegionSequencer::new();
        let mut result = BatchResult::default();

        for path in documents {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output_name = sequencer.next_name(&file_name);

            let reason = match self.process(&path, output_dir, &output_name) {
                Ok(DocumentOutcome::Extracted { written }) => {
                    info!(file = %file_name, output_name, images = written.len(), "Processed");
                    result.processed += 1;
                    continue;
                }
                Ok(DocumentOutcome::NoQualifyingImage) => FailureReason::NoQualifyingImage,
                Err(e) if e.is_fatal() || self.fail_fast => return Err(e),
                Err(e) => FailureReason::DecodeFailed(e.to_string()),
            };
            warn!("Can not detect required picture: {} ({})", file_name, reason);
            result.unprocessed += 1;
            result.failures.push(FailedDocument { file_name, reason });
        }

        if !result.failures.is_empty() {
            result.missing_list = Some(write_missing_list(output_dir, &result.failures)?);
        }

        Ok(result)
    }

    fn process(&self, path: &Path, output_dir: &Path, output_name: &str) -> Result<DocumentOutcome> {
        let source = self.opener.open(path)?;
        self.pipeline.extract(&source, output_dir, output_name)
    }
}

/// Regular files below `dir`, depth first. At each level the files come
/// first, sorted by name, then each subdirectory in name order.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });
    let mut documents = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            documents.push(entry.into_path());
        }
    }
    Ok(documents)
}

/// Write one failing file name per line to `{output_dir}/missing/missing_list.txt`
pub fn write_missing_list(output_dir: &Path, failures: &[FailedDocument]) -> Result<PathBuf> {
    let dir = output_dir.join(MISSING_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(MISSING_LIST_FILE);

    let contents: String = failures
        .iter()
        .map(|f| format!("{}\n", f.file_name))
        .collect();
    fs::write(&path, contents)?;

    info!(path = %path.display(), count = failures.len(), "Wrote missing list");
    Ok(path)
}

/// JSON summary of a batch run
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub generated_at: String,
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub config: &'a ExtractionConfig,
    pub result: &'a BatchResult,
}

impl<'a> BatchReport<'a> {
    pub fn new(
        input_dir: &'a Path,
        output_dir: &'a Path,
        config: &'a ExtractionConfig,
        result: &'a BatchResult,
    ) -> Self {
        Self {
            generated_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            input_dir,
            output_dir,
            config,
            result,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
