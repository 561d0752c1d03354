//! QuantFlow CLI — backtest, optimize, and validate commands.
//!
//! Commands:
//! - `backtest` — run a strategy graph over a CSV bar series and print the
//!   summary (optionally writing the full result as JSON)
//! - `optimize` — sweep parameter ranges from a TOML config and report the
//!   best combination
//! - `validate` — compile-only structural check of a graph

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use quantflow_core::domain::{Bar, Parameters, StrategyGraph};
use quantflow_core::engine::{BacktestOptions, BacktestResult, BacktestSummary, TargetMetric};
use quantflow_core::{compile, BacktestEngine};
use quantflow_runner::{start_optimization, JobStatus, ParamGrid};

#[derive(Parser)]
#[command(
    name = "quantflow",
    about = "QuantFlow CLI — node-graph strategy backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest and print the summary.
    Backtest {
        /// Path to the strategy graph JSON (visual editor export).
        #[arg(long)]
        graph: PathBuf,

        /// Path to the bar series CSV: timestamp,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// Parameter overrides, repeatable: --set indicator_1_period=50
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Initial account equity.
        #[arg(long, default_value_t = 10_000.0)]
        initial_equity: f64,

        /// Commission per fill side, percent.
        #[arg(long, default_value_t = 0.1)]
        commission: f64,

        /// Warm-up bars skipped before trading.
        #[arg(long, default_value_t = 100)]
        warmup: usize,

        /// Write the full result (trades + equity curve) as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run a parameter sweep from a TOML config and report the best combination.
    Optimize {
        /// Path to the strategy graph JSON.
        #[arg(long)]
        graph: PathBuf,

        /// Path to the bar series CSV.
        #[arg(long)]
        bars: PathBuf,

        /// Sweep config: target metric + parameter ranges.
        #[arg(long)]
        config: PathBuf,
    },
    /// Compile a strategy graph and report structural problems.
    Validate {
        /// Path to the strategy graph JSON.
        #[arg(long)]
        graph: PathBuf,
    },
}

/// Sweep config file.
///
/// ```toml
/// target = "sharpeRatio"
///
/// [parameters]
/// indicator_1_period = { min = 10, max = 50, step = 10 }
/// condition_1_threshold = { values = [60.0, 70.0, 80.0] }
///
/// [options]
/// initial_equity = 10000.0
/// ```
#[derive(Debug, Deserialize)]
struct SweepConfig {
    target: TargetMetric,
    parameters: ParamGrid,
    #[serde(default)]
    options: OptionsConfig,
}

/// Optional engine-option overrides; anything omitted keeps the default.
#[derive(Debug, Default, Deserialize)]
struct OptionsConfig {
    initial_equity: Option<f64>,
    commission_pct: Option<f64>,
    warmup_bars: Option<usize>,
    lookback_bars: Option<usize>,
    risk_per_trade_pct: Option<f64>,
    stop_loss_pct: Option<f64>,
}

impl OptionsConfig {
    fn to_options(&self) -> BacktestOptions {
        let defaults = BacktestOptions::default();
        BacktestOptions {
            initial_equity: self.initial_equity.unwrap_or(defaults.initial_equity),
            commission_pct: self.commission_pct.unwrap_or(defaults.commission_pct),
            warmup_bars: self.warmup_bars.unwrap_or(defaults.warmup_bars),
            lookback_bars: self.lookback_bars.unwrap_or(defaults.lookback_bars),
            risk_per_trade_pct: self.risk_per_trade_pct.unwrap_or(defaults.risk_per_trade_pct),
            stop_loss_pct: self.stop_loss_pct.unwrap_or(defaults.stop_loss_pct),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            graph,
            bars,
            set,
            initial_equity,
            commission,
            warmup,
            json,
        } => {
            let graph = load_graph(&graph)?;
            let bars = load_bars(&bars)?;
            let parameters = parse_overrides(&set)?;
            let options = BacktestOptions {
                initial_equity,
                commission_pct: commission,
                warmup_bars: warmup,
                ..BacktestOptions::default()
            };

            let engine = BacktestEngine::new(&graph, &bars, &parameters, options)
                .context("failed to construct backtest engine")?;
            let result = engine.run();

            print_summary(&result.summary);
            println!();
            println!("Trades:      {}", result.trades.len());
            println!("Fingerprint: {}", result.fingerprint);

            if let Some(path) = json {
                write_result_json(&path, &result)?;
                println!("Result written to {}", path.display());
            }
        }

        Commands::Optimize { graph, bars, config } => {
            let graph = load_graph(&graph)?;
            let bars = load_bars(&bars)?;
            let config_text = std::fs::read_to_string(&config)
                .with_context(|| format!("failed to read {}", config.display()))?;
            let sweep: SweepConfig =
                toml::from_str(&config_text).context("failed to parse sweep config")?;

            println!(
                "Sweeping {} parameter(s), target {}",
                sweep.parameters.len(),
                sweep.target
            );

            let handle = start_optimization(
                graph,
                bars,
                sweep.parameters,
                sweep.target,
                sweep.options.to_options(),
            );

            let mut last_progress = 0;
            loop {
                let job = handle.snapshot();
                if job.progress > last_progress {
                    println!("  progress: {}%", job.progress);
                    last_progress = job.progress;
                }
                if job.status.is_terminal() {
                    break;
                }
                thread::sleep(Duration::from_millis(200));
            }

            let job = handle.join();
            match job.status {
                JobStatus::Completed => {
                    match (&job.best_parameters, &job.best_summary) {
                        (Some(parameters), Some(summary)) => {
                            println!();
                            println!("=== Best combination (by {}) ===", job.target);
                            for (key, value) in parameters {
                                println!("  {key} = {value}");
                            }
                            println!();
                            print_summary(summary);
                        }
                        _ => println!("Sweep completed, but every combination failed."),
                    }
                }
                JobStatus::Failed => {
                    bail!(
                        "optimization failed: {}",
                        job.error.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
                _ => unreachable!("join returned a non-terminal job"),
            }
        }

        Commands::Validate { graph } => {
            let path = graph;
            let graph = load_graph(&path)?;
            match compile(&graph, &Parameters::new()) {
                Ok(compiled) => {
                    println!("OK: {} ({} nodes, {} edges)", path.display(), graph.nodes.len(), graph.edges.len());
                    println!("Fingerprint: {}", compiled.fingerprint());
                }
                Err(err) => bail!("invalid strategy graph: {err}"),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("QUANTFLOW_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_graph(path: &Path) -> Result<StrategyGraph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    StrategyGraph::from_json(&text)
        .with_context(|| format!("failed to parse strategy graph {}", path.display()))
}

/// Loads bars from `timestamp,open,high,low,close,volume` CSV.
///
/// Timestamps are RFC 3339 strings or unix seconds. A header row is detected
/// and skipped.
fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut bars = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad CSV record at line {}", row + 1))?;
        if row == 0 && record.get(0).is_some_and(|f| f.eq_ignore_ascii_case("timestamp")) {
            continue;
        }
        if record.len() < 6 {
            bail!("line {}: expected 6 columns, found {}", row + 1, record.len());
        }
        let timestamp = parse_timestamp(&record[0])
            .with_context(|| format!("line {}: bad timestamp '{}'", row + 1, &record[0]))?;
        let field = |i: usize, name: &str| -> Result<f64> {
            record[i]
                .parse::<f64>()
                .with_context(|| format!("line {}: bad {name} '{}'", row + 1, &record[i]))
        };
        bars.push(Bar {
            timestamp,
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: field(5, "volume")?,
        });
    }

    if bars.is_empty() {
        bail!("{} contains no bars", path.display());
    }
    Ok(bars)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(secs) = text.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .with_context(|| format!("unix timestamp out of range: {secs}"));
    }
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

/// Parses repeated `--set key=value` overrides.
fn parse_overrides(pairs: &[String]) -> Result<Parameters> {
    let mut parameters: Parameters = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--set expects KEY=VALUE, got '{pair}'");
        };
        let value: f64 = value
            .parse()
            .with_context(|| format!("--set {key}: '{value}' is not a number"))?;
        parameters.insert(key.to_string(), value);
    }
    Ok(parameters)
}

fn print_summary(summary: &BacktestSummary) {
    println!("=== Backtest Summary ===");
    println!("Initial equity:  {:>12.2}", summary.initial_equity);
    println!("Final equity:    {:>12.2}", summary.final_equity);
    println!("Total return:    {:>11.2}%", summary.total_return_pct);
    println!("Annual return:   {:>11.2}%", summary.annual_return);
    println!("Trades:          {:>8} ({} wins / {} losses)", summary.total_trades, summary.winning_trades, summary.losing_trades);
    println!("Win rate:        {:>11.2}%", summary.win_rate);
    println!("Profit factor:   {:>12.2}", summary.profit_factor);
    println!("Sharpe ratio:    {:>12.2}", summary.sharpe_ratio);
    println!("Max drawdown:    {:>11.2}%", summary.max_drawdown);
}

fn write_result_json(path: &Path, result: &BacktestResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
