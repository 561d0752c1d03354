//! Parameter grids and the parallel sweep executor.
//!
//! A grid maps `<nodeId>_<paramName>` keys to ranges; its Cartesian product
//! is the sweep. Combinations share nothing but the immutable graph and bar
//! series, so they fan out over rayon workers. A combination whose backtest
//! fails is logged and excluded from best-result selection — one bad point
//! never aborts the sweep.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use quantflow_core::domain::{Bar, Parameters, StrategyGraph};
use quantflow_core::engine::{BacktestOptions, BacktestSummary, TargetMetric};
use quantflow_core::BacktestEngine;

/// One parameter's sweep range: a stepped span or an explicit value list.
///
/// TOML/JSON forms: `{ min = 10, max = 50, step = 10 }` or
/// `{ values = [10, 20, 50] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRange {
    Span { min: f64, max: f64, step: f64 },
    Values { values: Vec<f64> },
}

impl ParamRange {
    /// Materializes the range. A non-positive step or an inverted span
    /// yields no values (and therefore an empty sweep).
    pub fn expand(&self) -> Vec<f64> {
        match self {
            ParamRange::Span { min, max, step } => {
                let mut values = Vec::new();
                if *step > 0.0 {
                    let mut v = *min;
                    // Tolerance absorbs accumulated float error at the top end
                    while v <= max + 1e-9 {
                        values.push(v);
                        v += step;
                    }
                }
                values
            }
            ParamRange::Values { values } => values.clone(),
        }
    }
}

/// Sweep definition: `<nodeId>_<paramName>` → range. BTreeMap keeps the
/// expansion order deterministic.
pub type ParamGrid = BTreeMap<String, ParamRange>;

/// Cartesian product of all ranges, in key order, via the recursive
/// combination builder.
///
/// An empty grid yields one empty combination (a single baseline run); a grid
/// containing an empty range yields zero combinations.
pub fn expand_grid(grid: &ParamGrid) -> Vec<Parameters> {
    let entries: Vec<(&String, Vec<f64>)> =
        grid.iter().map(|(key, range)| (key, range.expand())).collect();
    let mut combinations = Vec::new();
    let mut current = Parameters::new();
    build_combinations(&entries, 0, &mut current, &mut combinations);
    combinations
}

fn build_combinations(
    entries: &[(&String, Vec<f64>)],
    index: usize,
    current: &mut Parameters,
    out: &mut Vec<Parameters>,
) {
    if index == entries.len() {
        out.push(current.clone());
        return;
    }
    let (key, values) = &entries[index];
    for &value in values {
        current.insert((*key).clone(), value);
        build_combinations(entries, index + 1, current, out);
    }
    current.remove(entries[index].0.as_str());
}

/// What happened across one full sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Best combination and its summary, by the target metric. None when
    /// every combination failed or was cancelled away.
    pub best: Option<(Parameters, BacktestSummary)>,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

enum ComboOutcome {
    Done(Parameters, BacktestSummary),
    Failed,
    Skipped,
}

/// Runs every combination over the shared graph and bars, in parallel.
///
/// `cancel` stops scheduling new combinations promptly; in-flight ones
/// finish. `progress(finished, total)` is invoked after each combination —
/// callers serialize their own state updates.
pub fn run_sweep<F>(
    graph: &StrategyGraph,
    bars: &[Bar],
    combinations: Vec<Parameters>,
    target: TargetMetric,
    options: &BacktestOptions,
    cancel: &AtomicBool,
    progress: F,
) -> SweepOutcome
where
    F: Fn(usize, usize) + Send + Sync,
{
    let total = combinations.len();
    let finished = AtomicUsize::new(0);

    let outcomes: Vec<ComboOutcome> = combinations
        .into_par_iter()
        .map(|params| {
            if cancel.load(Ordering::SeqCst) {
                return ComboOutcome::Skipped;
            }
            let outcome = BacktestEngine::new(graph, bars, &params, options.clone())
                .map(|engine| engine.run());
            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            progress(done, total);
            match outcome {
                Ok(result) => ComboOutcome::Done(params, result.summary),
                Err(err) => {
                    tracing::warn!(error = %err, ?params, "skipping failed parameter combination");
                    ComboOutcome::Failed
                }
            }
        })
        .collect();

    let mut best: Option<(Parameters, BacktestSummary)> = None;
    let mut completed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for outcome in outcomes {
        match outcome {
            ComboOutcome::Done(params, summary) => {
                completed += 1;
                if is_better(target, &summary, best.as_ref().map(|(_, s)| s)) {
                    best = Some((params, summary));
                }
            }
            ComboOutcome::Failed => failed += 1,
            ComboOutcome::Skipped => skipped += 1,
        }
    }

    SweepOutcome {
        best,
        completed,
        failed,
        skipped,
        total,
    }
}

/// Lower wins for drawdown, higher for everything else; NaN never wins.
fn is_better(
    target: TargetMetric,
    candidate: &BacktestSummary,
    incumbent: Option<&BacktestSummary>,
) -> bool {
    let value = target.value_of(candidate);
    if value.is_nan() {
        return false;
    }
    let Some(incumbent) = incumbent else {
        return true;
    };
    let current = target.value_of(incumbent);
    if current.is_nan() {
        return true;
    }
    if target.lower_is_better() {
        value < current
    } else {
        value > current
    }
}
