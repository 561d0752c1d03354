//! Background optimization jobs.
//!
//! `start_optimization` returns a handle immediately and runs the sweep on a
//! dedicated worker thread (the sweep itself fans out over rayon). The job
//! record is the only shared mutable state; every write goes through one
//! mutex, and the best result is published exactly once, after the sweep
//! finishes — a poller can never observe a partial best.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use quantflow_core::domain::{validate_series, Bar, Parameters, StrategyGraph};
use quantflow_core::engine::{BacktestOptions, BacktestSummary, TargetMetric};

use crate::sweep::{expand_grid, run_sweep, ParamGrid};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Job lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Poll-able job record, mutated in place as the sweep progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub id: u64,
    pub status: JobStatus,
    /// 0..=100, rounded percentage of combinations finished.
    pub progress: u8,
    pub target: TargetMetric,
    pub best_parameters: Option<Parameters>,
    pub best_summary: Option<BacktestSummary>,
    pub error: Option<String>,
}

impl OptimizationJob {
    fn new(id: u64, target: TargetMetric) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            target,
            best_parameters: None,
            best_summary: None,
            error: None,
        }
    }
}

/// Handle to a running optimization: poll it, cancel it, or join it.
pub struct OptimizationHandle {
    id: u64,
    record: Arc<Mutex<OptimizationJob>>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl OptimizationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Clone of the current job record.
    pub fn snapshot(&self) -> OptimizationJob {
        self.record.lock().expect("job record poisoned").clone()
    }

    pub fn status(&self) -> JobStatus {
        self.snapshot().status
    }

    pub fn progress(&self) -> u8 {
        self.snapshot().progress
    }

    /// Requests cancellation: no new combinations are scheduled, in-flight
    /// ones finish, and the job terminates as `Failed`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Blocks until the sweep finishes and returns the final record.
    pub fn join(mut self) -> OptimizationJob {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.snapshot()
    }
}

/// Starts an optimization sweep in the background and returns immediately.
///
/// The job fails (never panics, never errors synchronously) when the grid
/// expands to zero combinations or the bar series is invalid; per-combination
/// backtest failures are logged and skipped.
pub fn start_optimization(
    graph: StrategyGraph,
    bars: Vec<Bar>,
    grid: ParamGrid,
    target: TargetMetric,
    options: BacktestOptions,
) -> OptimizationHandle {
    let id = NEXT_JOB_ID.fetch_add(1, Ordering::SeqCst);
    let record = Arc::new(Mutex::new(OptimizationJob::new(id, target)));
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_record = Arc::clone(&record);
    let worker_cancel = Arc::clone(&cancel);
    let worker = thread::Builder::new()
        .name(format!("quantflow-opt-{id}"))
        .spawn(move || {
            run_job(graph, bars, grid, target, options, worker_record, worker_cancel);
        })
        .expect("failed to spawn optimization worker thread");

    OptimizationHandle {
        id,
        record,
        cancel,
        worker: Some(worker),
    }
}

fn run_job(
    graph: StrategyGraph,
    bars: Vec<Bar>,
    grid: ParamGrid,
    target: TargetMetric,
    options: BacktestOptions,
    record: Arc<Mutex<OptimizationJob>>,
    cancel: Arc<AtomicBool>,
) {
    let fail = |message: String| {
        let mut job = record.lock().expect("job record poisoned");
        job.status = JobStatus::Failed;
        job.error = Some(message);
    };

    if let Err(err) = validate_series(&bars) {
        fail(format!("optimization setup failed: {err}"));
        return;
    }

    let combinations = expand_grid(&grid);
    if combinations.is_empty() {
        fail("optimization setup failed: zero parameter combinations generated".to_string());
        return;
    }

    {
        let mut job = record.lock().expect("job record poisoned");
        job.status = JobStatus::Running;
    }

    let progress_record = Arc::clone(&record);
    let outcome = run_sweep(
        &graph,
        &bars,
        combinations,
        target,
        &options,
        &cancel,
        move |finished, total| {
            let pct = ((finished as f64 / total as f64) * 100.0).round() as u8;
            let mut job = progress_record.lock().expect("job record poisoned");
            // Finish order is nondeterministic under rayon; never move backwards
            job.progress = job.progress.max(pct);
        },
    );

    // Publish once, after the whole sweep settled.
    let mut job = record.lock().expect("job record poisoned");
    if cancel.load(Ordering::SeqCst) {
        job.status = JobStatus::Failed;
        job.error = Some("optimization cancelled".to_string());
        return;
    }
    tracing::info!(
        job = job.id,
        completed = outcome.completed,
        failed = outcome.failed,
        "optimization sweep finished"
    );
    if let Some((parameters, summary)) = outcome.best {
        job.best_parameters = Some(parameters);
        job.best_summary = Some(summary);
    }
    job.progress = 100;
    job.status = JobStatus::Completed;
}
