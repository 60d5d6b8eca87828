//! Parallel execution of training units over a shared prepared dataset.
//!
//! Run-level artifacts are computed once on the calling thread; the units
//! are then fanned out over a local rayon pool. Units are independent by
//! construction, so the only shared state is the prepared data (read only)
//! and the progress counters.
//!
//! Cancellation is cooperative: a unit already training finishes, units
//! not yet started are dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::{Pipeline, PreparedData, SkippedUnit, UnitId, UnitReport};
use crate::schema::{OhlcvSeries, SentimentSeries};
use crate::selection::SelectionResult;

/// How unit errors affect the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ErrorMode {
    /// The first unit error aborts the batch.
    FailFast,
    /// Unit errors are collected and reported; the batch keeps going.
    /// Fatal errors abort regardless.
    #[default]
    CollectErrors,
}

/// Shared flag for cancelling a running batch from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Settings for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Worker threads; `None` lets rayon size the pool.
    pub num_threads: Option<usize>,
    pub error_mode: ErrorMode,
    /// Log progress after every finished unit.
    pub report_progress: bool,
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn with_progress(mut self, report: bool) -> Self {
        self.report_progress = report;
        self
    }

    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// One trained unit with its timing.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub report: UnitReport,
    pub elapsed: Duration,
    /// Index of the rayon worker that ran the unit.
    pub thread_id: usize,
}

/// Snapshot handed to progress callbacks after each finished unit.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub completed: usize,
    pub total: usize,
    pub percent_complete: f64,
    pub elapsed: Duration,
    /// Linear estimate from throughput so far; `None` before the first unit.
    pub estimated_remaining: Option<Duration>,
}

/// Observer for batch progress. Callbacks run on worker threads.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);

    fn on_complete(&self, output: &BatchOutput) {
        let _ = output;
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        info!(
            completed = info.completed,
            total = info.total,
            percent = format_args!("{:.0}%", info.percent_complete),
            remaining = ?info.estimated_remaining,
            "batch progress"
        );
    }

    fn on_complete(&self, output: &BatchOutput) {
        info!(
            trained = output.outcomes.len(),
            skipped = output.skipped.len(),
            elapsed = ?output.elapsed,
            "batch complete"
        );
    }
}

struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Output of a batch run. `outcomes` keeps unit order, not finish order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub selection: SelectionResult,
    pub outcomes: Vec<UnitOutcome>,
    /// Units that failed with a unit-scoped error, with the reason.
    pub skipped: Vec<SkippedUnit>,
    /// Units dropped because the batch was cancelled before they started.
    pub cancelled_count: usize,
    pub elapsed: Duration,
    pub threads_used: usize,
    pub was_cancelled: bool,
}

impl BatchOutput {
    pub fn successful_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn all_successful(&self) -> bool {
        self.skipped.is_empty() && !self.was_cancelled
    }
}

enum UnitResult {
    Success(Box<UnitOutcome>),
    Failure(UnitId, PipelineError),
    Cancelled,
}

/// Runs every unit of a pipeline in parallel.
pub struct BatchRunner {
    pipeline: Pipeline,
    config: BatchConfig,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(pipeline: Pipeline, config: BatchConfig) -> Self {
        Self {
            pipeline,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Clone of the runner's token, for cancelling from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The pipeline the runner executes.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn run(
        &self,
        series: &[OhlcvSeries],
        sentiment: Option<&SentimentSeries>,
    ) -> Result<BatchOutput> {
        if self.config.report_progress {
            self.run_with_progress(series, sentiment, &ConsoleProgress)
        } else {
            self.run_with_progress(series, sentiment, &SilentProgress)
        }
    }

    /// Prepare once, then train every unit on a local pool.
    pub fn run_with_progress(
        &self,
        series: &[OhlcvSeries],
        sentiment: Option<&SentimentSeries>,
        progress: &dyn ProgressCallback,
    ) -> Result<BatchOutput> {
        let prepared = self.pipeline.prepare(series, sentiment)?;
        self.run_prepared(&prepared, progress)
    }

    /// Train every unit of already-prepared data on a local pool.
    pub fn run_prepared(
        &self,
        prepared: &PreparedData,
        progress: &dyn ProgressCallback,
    ) -> Result<BatchOutput> {
        let started = Instant::now();
        let ids = prepared.unit_ids(&self.pipeline.config().labels);
        let total = ids.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads.unwrap_or(0))
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build thread pool: {e}")))?;
        let threads_used = pool.current_num_threads();
        info!(units = total, threads = threads_used, "batch started");

        let fail_fast = self.config.error_mode == ErrorMode::FailFast;
        let abort = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);

        let results: Vec<UnitResult> = pool.install(|| {
            ids.par_iter()
                .map(|id| {
                    if self.cancel.is_cancelled() || abort.load(Ordering::Relaxed) {
                        return UnitResult::Cancelled;
                    }
                    let unit_started = Instant::now();
                    let result = self.pipeline.run_unit(prepared, id);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    let elapsed = started.elapsed();
                    progress.on_progress(&ProgressInfo {
                        completed: done,
                        total,
                        percent_complete: done as f64 / total.max(1) as f64 * 100.0,
                        elapsed,
                        estimated_remaining: estimate_remaining(elapsed, done, total),
                    });
                    match result {
                        Ok(report) => {
                            debug!(unit = %id, elapsed = ?unit_started.elapsed(), "unit trained");
                            UnitResult::Success(Box::new(UnitOutcome {
                                report,
                                elapsed: unit_started.elapsed(),
                                thread_id: rayon::current_thread_index().unwrap_or(0),
                            }))
                        }
                        Err(e) => {
                            if fail_fast || e.is_fatal() {
                                abort.store(true, Ordering::Relaxed);
                            }
                            warn!(unit = %id, error = %e, "unit failed");
                            UnitResult::Failure(id.clone(), e)
                        }
                    }
                })
                .collect()
        });

        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled_count = 0;
        for result in results {
            match result {
                UnitResult::Success(outcome) => outcomes.push(*outcome),
                UnitResult::Failure(id, error) => {
                    if error.is_fatal() || fail_fast {
                        return Err(error);
                    }
                    skipped.push(SkippedUnit {
                        id,
                        reason: error.to_string(),
                    });
                }
                UnitResult::Cancelled => cancelled_count += 1,
            }
        }

        let output = BatchOutput {
            selection: prepared.selection.clone(),
            outcomes,
            skipped,
            cancelled_count,
            elapsed: started.elapsed(),
            threads_used,
            was_cancelled: self.cancel.is_cancelled(),
        };
        progress.on_complete(&output);
        Ok(output)
    }
}

fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let per_unit = elapsed.as_secs_f64() / completed as f64;
    Some(Duration::from_secs_f64(
        per_unit * total.saturating_sub(completed) as f64,
    ))
}

// ============================================================================
// Tests
// ============================================================================
