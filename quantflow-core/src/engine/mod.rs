//! Backtest engine — replays a compiled strategy bar-by-bar.
//!
//! The loop is strictly sequential: equity and position state carry forward,
//! so bar i+1 is never evaluated before bar i completes. Each bar gets a
//! bounded lookback window, a fresh indicator snapshot (the previous bar's
//! snapshot is reused from the prior iteration), one `execute` call, and one
//! equity-curve point.

pub mod result;
pub mod stats;

pub use result::{BacktestResult, BacktestSummary, EquityPoint, TargetMetric};

use thiserror::Error;

use crate::compiler::{compile, CompileError, CompiledStrategy, Frame, IndicatorSnapshot};
use crate::domain::{
    validate_series, Bar, Parameters, Position, SeriesError, SignalAction, StrategyGraph, Trade,
};

/// Engine configuration with the platform's defaults.
#[derive(Debug, Clone)]
pub struct BacktestOptions {
    pub initial_equity: f64,
    /// Commission per fill side, percent of fill value.
    pub commission_pct: f64,
    /// Bars skipped before trading so indicators stabilize.
    pub warmup_bars: usize,
    /// Upper bound on the indicator window, bars.
    pub lookback_bars: usize,
    /// Dollar risk per trade, percent of current equity.
    pub risk_per_trade_pct: f64,
    /// Assumed stop distance used for sizing, percent of entry price.
    pub stop_loss_pct: f64,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            initial_equity: 10_000.0,
            commission_pct: 0.1,
            warmup_bars: 100,
            lookback_bars: 200,
            risk_per_trade_pct: 1.0,
            stop_loss_pct: 2.0,
        }
    }
}

/// Why an engine could not be constructed. Both variants are fatal and
/// surface immediately; nothing here is retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input series: {0}")]
    InvalidInput(#[from] SeriesError),
    #[error("invalid strategy: {0}")]
    InvalidStrategy(#[from] CompileError),
}

/// A single backtest run: compiled strategy + validated bars + options.
///
/// Borrows the bar series — optimizer sweeps share one immutable series
/// across many engines; only position/equity state is per-run.
#[derive(Debug)]
pub struct BacktestEngine<'a> {
    strategy: CompiledStrategy,
    bars: &'a [Bar],
    options: BacktestOptions,
}

impl<'a> BacktestEngine<'a> {
    /// Fails fast on a malformed bar series or a graph that does not compile.
    pub fn new(
        graph: &StrategyGraph,
        bars: &'a [Bar],
        parameters: &Parameters,
        options: BacktestOptions,
    ) -> Result<Self, EngineError> {
        validate_series(bars)?;
        let strategy = compile(graph, parameters)?;
        Ok(Self {
            strategy,
            bars,
            options,
        })
    }

    pub fn strategy(&self) -> &CompiledStrategy {
        &self.strategy
    }

    /// Runs the full simulation. Synchronous; long series take a while.
    ///
    /// A series shorter than the warm-up window produces an empty result
    /// (no trades, final equity == initial equity) rather than an error.
    pub fn run(&self) -> BacktestResult {
        let opts = &self.options;
        let n = self.bars.len();

        if n <= opts.warmup_bars {
            return BacktestResult {
                fingerprint: self.strategy.fingerprint().to_string(),
                summary: BacktestSummary::empty(opts.initial_equity),
                trades: Vec::new(),
                equity_curve: Vec::new(),
            };
        }

        let mut equity = opts.initial_equity;
        let mut position: Option<Position> = None;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(n - opts.warmup_bars);
        let mut prev_snapshot: Option<IndicatorSnapshot> = None;

        for i in opts.warmup_bars..n {
            let current = &self.bars[i];
            let previous = &self.bars[i - 1];

            let snapshot = self.snapshot_at(i);
            let previous_snapshot = match prev_snapshot.take() {
                Some(s) => s,
                None => self.snapshot_at(i - 1),
            };

            let frame = Frame {
                current,
                previous: Some(previous),
                indicators: &snapshot,
                previous_indicators: &previous_snapshot,
            };

            if let Some(signal) = self.strategy.execute(&frame, position.as_ref()) {
                match signal.action {
                    SignalAction::Exit => match position.take() {
                        Some(open) if open.side == signal.side => {
                            let trade = close_position(&open, current, opts.commission_pct);
                            equity += trade.profit;
                            trades.push(trade);
                        }
                        still_open => position = still_open,
                    },
                    SignalAction::Entry => {
                        if position.is_none() {
                            position = open_position(signal.side, current, equity, opts);
                        }
                    }
                }
            }

            equity_curve.push(EquityPoint {
                timestamp: current.timestamp,
                equity,
            });
            prev_snapshot = Some(snapshot);
        }

        let summary = stats::compute_summary(opts.initial_equity, &trades, &equity_curve);
        BacktestResult {
            fingerprint: self.strategy.fingerprint().to_string(),
            summary,
            trades,
            equity_curve,
        }
    }

    /// Indicator snapshot over the bounded window ending at bar `i`.
    fn snapshot_at(&self, i: usize) -> IndicatorSnapshot {
        let start = (i + 1).saturating_sub(self.options.lookback_bars + 1);
        let window = &self.bars[start..=i];
        self.strategy
            .indicator_nodes()
            .iter()
            .map(|(id, spec)| (id.clone(), spec.compute(window)))
            .collect()
    }
}

/// Fixed-fraction risk sizing: risk dollars over the assumed stop distance,
/// clamped so position value never exceeds available equity.
fn open_position(
    side: crate::domain::PositionSide,
    bar: &Bar,
    equity: f64,
    opts: &BacktestOptions,
) -> Option<Position> {
    let entry_price = bar.close;
    let stop_distance = entry_price * opts.stop_loss_pct / 100.0;
    if entry_price <= 0.0 || stop_distance <= 0.0 || equity <= 0.0 {
        return None;
    }
    let risk_amount = equity * opts.risk_per_trade_pct / 100.0;
    let mut quantity = risk_amount / stop_distance;
    if quantity * entry_price > equity {
        quantity = equity / entry_price;
    }
    if quantity <= 0.0 {
        return None;
    }
    Some(Position {
        side,
        entry_price,
        entry_time: bar.timestamp,
        quantity,
    })
}

fn close_position(open: &Position, bar: &Bar, commission_pct: f64) -> Trade {
    let exit_price = bar.close;
    let gross = open.price_move(exit_price) * open.quantity;
    let commission =
        (open.entry_price + exit_price) * open.quantity * commission_pct / 100.0;
    let profit_pct = match open.side {
        crate::domain::PositionSide::Long => (exit_price / open.entry_price - 1.0) * 100.0,
        crate::domain::PositionSide::Short => (open.entry_price / exit_price - 1.0) * 100.0,
    };
    Trade {
        entry_time: open.entry_time,
        exit_time: bar.timestamp,
        entry_price: open.entry_price,
        exit_price,
        side: open.side,
        quantity: open.quantity,
        profit: gross - commission,
        profit_pct,
        commission,
        duration_secs: (bar.timestamp - open.entry_time).num_seconds(),
    }
}
