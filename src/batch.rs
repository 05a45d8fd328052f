//! Batch processing: many source files through the engine, in parallel.
//!
//! The engine transforms one image at a time; this module owns everything
//! around that — file I/O, per-item failure isolation, bounded parallelism,
//! progress reporting, and cooperative cancellation.
//!
//! ## Failure policy
//!
//! Every error past argument construction is per-item. A file that fails
//! validation, decoding, or encoding lands in the report's `failures` list
//! and its siblings are unaffected. Nothing in the batch loop retries.
//!
//! ## Parallelism
//!
//! Items run on a dedicated rayon pool capped at [`MAX_JOBS`] workers unless
//! the caller asks for fewer. Each in-flight item holds a decoded raster
//! plus its encoded outputs in memory, so the cap is a memory bound as much
//! as a CPU one — decoding an entire directory at once is exactly the
//! failure mode the cap exists to prevent.
//!
//! ## Progress
//!
//! Callers may pass an `mpsc::Sender`; the batch emits one event per item
//! start and completion. The CLI drains these on a printer thread so batch
//! workers never block on stdout.

use crate::engine::{self, DecodeError, ProcessedImage, TransformError};
use crate::settings::ProcessingSettings;
use crate::validate::{self, SourceValidationError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Hard ceiling on batch workers. Each worker holds a full decoded image in
/// memory, so more parallelism past this point buys contention, not speed.
pub const MAX_JOBS: usize = 8;

/// Why one item failed. Wraps the per-stage error types so the report can
/// distinguish "rejected before decode" from "bad bytes" from "encoder
/// trouble".
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    Validation(#[from] SourceValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Cooperative cancellation handle. Clone it, hand one to the batch, keep
/// one to flip from a signal handler or UI. Checked between items — an
/// in-flight encode finishes before the batch stops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One encoded output file, named and ready to write or archive.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl OutputFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A successfully processed source with all of its outputs (one in single
/// mode, several in srcset mode).
#[derive(Debug)]
pub struct ProcessedFile {
    pub source: PathBuf,
    pub original_size: u64,
    pub outputs: Vec<OutputFile>,
}

impl ProcessedFile {
    pub fn processed_size(&self) -> u64 {
        self.outputs.iter().map(OutputFile::size).sum()
    }
}

/// A source that failed somewhere in the pipeline.
#[derive(Debug)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: ItemError,
}

/// Everything a batch run produced, successes and failures side by side.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedFile>,
    pub failures: Vec<FailedFile>,
    /// True when the run stopped early via the cancel token; items not yet
    /// started appear in neither list.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn total_original_size(&self) -> u64 {
        self.processed.iter().map(|p| p.original_size).sum()
    }

    pub fn total_processed_size(&self) -> u64 {
        self.processed.iter().map(ProcessedFile::processed_size).sum()
    }

    pub fn output_count(&self) -> usize {
        self.processed.iter().map(|p| p.outputs.len()).sum()
    }
}

/// Progress events, one per item transition. `completed` counts finished
/// items (success or failure) out of `total`.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        source: PathBuf,
    },
    Finished {
        source: PathBuf,
        completed: usize,
        total: usize,
        outputs: usize,
        processed_bytes: u64,
    },
    Failed {
        source: PathBuf,
        completed: usize,
        total: usize,
        reason: String,
    },
}

/// Knobs for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker count; 0 means auto (CPU cores, capped at [`MAX_JOBS`]).
    pub jobs: usize,
    pub cancel: CancelToken,
}

/// Resolve the effective worker count.
pub fn effective_jobs(requested: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let auto = cores.min(MAX_JOBS);
    if requested == 0 {
        auto
    } else {
        requested.min(MAX_JOBS)
    }
}

/// Build the output filename for one engine result.
///
/// Single mode: `{stem}_optimized.{ext}`. Srcset mode: `{stem}-{width}w.webp`
/// via the result's own suffix and format.
pub fn output_name(stem: &str, result: &ProcessedImage) -> String {
    match &result.name_suffix {
        Some(suffix) => format!("{stem}{suffix}.{}", result.format.extension()),
        None => format!("{stem}_optimized.{}", result.format.extension()),
    }
}

/// Run the full pipeline for one source file.
fn process_one(path: &Path, settings: &ProcessingSettings) -> Result<ProcessedFile, ItemError> {
    let bytes = std::fs::read(path)?;
    let kind = validate::validate_source(path, &bytes)?;
    debug!(path = %path.display(), mime = kind.mime(), size = bytes.len(), "decoding source");

    let image = engine::decode(&bytes, kind)?;
    let results = engine::transform(&image, settings)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let outputs = results
        .into_iter()
        .map(|r| OutputFile {
            name: output_name(&stem, &r),
            width: r.width,
            height: r.height,
            bytes: r.bytes,
        })
        .collect();

    Ok(ProcessedFile {
        source: path.to_path_buf(),
        original_size: bytes.len() as u64,
        outputs,
    })
}

enum ItemOutcome {
    Processed(ProcessedFile),
    Failed(FailedFile),
    Skipped,
}

/// Process a batch of source files.
///
/// Item order in the report matches input order regardless of which worker
/// finished first.
pub fn run_batch(
    files: &[PathBuf],
    settings: &ProcessingSettings,
    options: &BatchOptions,
    progress: Option<Sender<ProgressEvent>>,
) -> BatchReport {
    let started = Instant::now();
    let total = files.len();
    let completed = AtomicUsize::new(0);

    let run = || {
        files
            .par_iter()
            .map(|path| {
                if options.cancel.is_cancelled() {
                    return ItemOutcome::Skipped;
                }
                if let Some(tx) = &progress {
                    let _ = tx.send(ProgressEvent::Started {
                        source: path.clone(),
                    });
                }

                let outcome = process_one(path, settings);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;

                match outcome {
                    Ok(processed) => {
                        if let Some(tx) = &progress {
                            let _ = tx.send(ProgressEvent::Finished {
                                source: path.clone(),
                                completed: done,
                                total,
                                outputs: processed.outputs.len(),
                                processed_bytes: processed.processed_size(),
                            });
                        }
                        ItemOutcome::Processed(processed)
                    }
                    Err(error) => {
                        warn!(path = %path.display(), %error, "item failed");
                        if let Some(tx) = &progress {
                            let _ = tx.send(ProgressEvent::Failed {
                                source: path.clone(),
                                completed: done,
                                total,
                                reason: error.to_string(),
                            });
                        }
                        ItemOutcome::Failed(FailedFile {
                            source: path.to_path_buf(),
                            error,
                        })
                    }
                }
            })
            .collect::<Vec<_>>()
    };

    let jobs = effective_jobs(options.jobs);
    let outcomes = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(run),
        Err(e) => {
            // Degrade to the global pool rather than failing the batch.
            warn!(%e, "dedicated thread pool unavailable");
            run()
        }
    };

    let mut report = BatchReport {
        cancelled: options.cancel.is_cancelled(),
        elapsed: started.elapsed(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Processed(p) => report.processed.push(p),
            ItemOutcome::Failed(f) => report.failures.push(f),
            ItemOutcome::Skipped => {}
        }
    }
    report
}
