//! Bounded fan-out of per-post build jobs.
//!
//! Jobs run on a dedicated rayon pool sized to the concurrency limit, so at
//! most `concurrency` jobs run at once; idle workers steal the next pending
//! job as soon as they finish one, and every job is attempted exactly once.
//! A failing (or panicking) job is recorded and the batch goes on.

use crate::config::BuildConfig;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderJobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Worker panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to start worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// One post to render into one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub post_id: String,
    pub output_path: PathBuf,
}

impl BuildJob {
    pub fn new(post_id: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            post_id: post_id.into(),
            output_path: output_path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub post_id: String,
    pub error: String,
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Post ids that succeeded, in job order
    pub completed: Vec<String>,
    /// Failed jobs, in job order
    pub failures: Vec<JobFailure>,
    /// Final state of every job, indexed like the input
    pub states: Vec<JobState>,
    /// Highest number of jobs observed running at the same time
    pub peak_in_flight: usize,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    /// One line per failure, e.g. "Failed to process hello: IO error: ..."
    pub fn failure_summary(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("Failed to process {}: {}", f.post_id, f.error))
            .collect()
    }
}

/// Fixed-size pool of build workers
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    progress_interval: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress_interval: 10,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.concurrency()).with_progress_interval(config.progress_interval)
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `work` once per job with bounded parallelism.
    ///
    /// Returns only after every job has finished and no job is in flight.
    pub fn run<F>(&self, jobs: &[BuildJob], work: F) -> Result<BuildReport, PoolError>
    where
        F: Fn(&BuildJob) -> Result<(), RenderJobError> + Sync,
    {
        let total = jobs.len();
        let mut report = BuildReport {
            states: vec![JobState::Queued; total],
            ..BuildReport::default()
        };
        if total == 0 {
            return Ok(report);
        }

        let workers = self.concurrency.min(total);
        tracing::info!("Processing {} posts with {} workers", total, workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quillpress-build-{i}"))
            .build()?;

        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let finished = AtomicUsize::new(0);

        let results: Vec<Result<(), RenderJobError>> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(running, Ordering::SeqCst);
                    tracing::debug!("Started {}", job.post_id);

                    let result = catch_unwind(AssertUnwindSafe(|| work(job))).unwrap_or_else(
                        |payload| Err(RenderJobError::Panicked(panic_message(&*payload))),
                    );
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    if let Err(e) = &result {
                        tracing::error!("Failed to process {}: {}", job.post_id, e);
                    }
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % self.progress_interval == 0 || done == total {
                        tracing::info!("Progress: {}/{} posts processed", done, total);
                    }
                    result
                })
                .collect()
        });

        for (idx, (job, result)) in jobs.iter().zip(results).enumerate() {
            report.states[idx] = match result {
                Ok(()) => {
                    report.completed.push(job.post_id.clone());
                    JobState::Done
                }
                Err(e) => {
                    let error = e.to_string();
                    report.failures.push(JobFailure {
                        post_id: job.post_id.clone(),
                        error: error.clone(),
                    });
                    JobState::Failed(error)
                }
            };
        }
        report.peak_in_flight = peak.load(Ordering::SeqCst);
        Ok(report)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
