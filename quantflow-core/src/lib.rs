//! QuantFlow Core — strategy compilation and backtesting engine.
//!
//! This crate contains the heart of the platform:
//! - Domain types (bars, the node/edge strategy graph, positions, trades)
//! - Indicator library (SMA, EMA, RSI, MACD, Bollinger, Stochastic)
//! - Strategy compiler: graph → executable strategy with recursive,
//!   per-bar-memoized evaluation
//! - Bar-by-bar backtest loop with equity/position accounting
//! - Summary statistics (win rate, profit factor, Sharpe, drawdown)
//! - Deterministic strategy fingerprints
//!
//! The optimizer that sweeps parameter grids over this engine lives in
//! `quantflow-runner`.

pub mod compiler;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;

pub use compiler::{compile, CompileError, CompiledStrategy, Frame};
pub use engine::{BacktestEngine, BacktestOptions, BacktestResult, EngineError, TargetMetric};
