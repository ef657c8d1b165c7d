//! RevertLab CLI — walk-forward optimization of the candlestick reversion
//! strategy.
//!
//! Commands:
//! - `optimize` — run walk-forward optimization and write CSV/Markdown/JSON reports
//! - `run` — evaluate one parameter set over the full series
//! - `splits` — print the in-sample/out-of-sample window bounds

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use revertlab_core::domain::PriceSeries;
use revertlab_runner::export::{export_timeline_csv, write_reports};
use revertlab_runner::{
    generate_synthetic, load_csv, run_walk_forward, split_windows, AutoSelector,
    GridSearchOptimizer, ManualSelector, ParameterSet, PortfolioStats, Selector, WfoConfig,
    WfoReport, WindowOutcome,
};

#[derive(Parser)]
#[command(
    name = "revertlab",
    about = "RevertLab CLI — candlestick reversion strategy with walk-forward optimization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run walk-forward optimization over the configured grid.
    Optimize {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Use N synthetic bars instead of the configured data file.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Choose each window's parameters interactively.
        #[arg(long, default_value_t = false)]
        manual: bool,

        /// Output directory for reports.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Evaluate one parameter set over the full series.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Parameter override as name=value. Repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Use N synthetic bars instead of the configured data file.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Write the per-bar timeline CSV here.
        #[arg(long)]
        timeline: Option<PathBuf>,
    },
    /// Print walk-forward window bounds for a bar count.
    Splits {
        /// Total number of bars.
        #[arg(long)]
        bars: usize,

        /// Fraction of each window used in-sample, strictly between 0 and 1.
        #[arg(long, default_value_t = 0.8)]
        in_sample_fraction: f64,

        /// Number of windows.
        #[arg(long, default_value_t = 16)]
        windows: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            config,
            synthetic,
            seed,
            manual,
            output_dir,
        } => run_optimize(&config, synthetic, seed, manual, &output_dir),
        Commands::Run {
            config,
            params,
            synthetic,
            seed,
            timeline,
        } => run_single(&config, &params, synthetic, seed, timeline.as_deref()),
        Commands::Splits {
            bars,
            in_sample_fraction,
            windows,
        } => run_splits(bars, in_sample_fraction, windows),
    }
}

fn load_series(config: &WfoConfig, synthetic: Option<usize>, seed: u64) -> Result<PriceSeries> {
    match synthetic {
        Some(n) => {
            eprintln!("Using {n} synthetic bars (seed {seed})");
            generate_synthetic(n, seed, config.portfolio.freq)
                .context("failed to generate synthetic bars")
        }
        None => {
            let path = config
                .data_path()
                .context("set [data] path in the config or pass --synthetic N")?;
            load_csv(path, &config.data.time_column)
                .with_context(|| format!("failed to load {}", path.display()))
        }
    }
}

fn run_optimize(
    config_path: &Path,
    synthetic: Option<usize>,
    seed: u64,
    manual: bool,
    output_dir: &Path,
) -> Result<()> {
    let config = WfoConfig::from_file(config_path)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let grid = config.grid()?;
    let series = load_series(&config, synthetic, seed)?;
    info!(
        config = %config_path.display(),
        filter = ?config.strategy.filter,
        stop = ?config.strategy.stop,
        dataset = %series.dataset_hash(),
        "inputs loaded"
    );

    println!(
        "Walk-forward: {} bars, {} windows, {} combinations per window",
        series.len(),
        config.walk_forward.windows,
        grid.size()
    );

    let evaluator = config.evaluator();
    let optimizer = GridSearchOptimizer::new(config.walk_forward.workers)?;
    let mut selector: Box<dyn Selector> = if manual {
        Box::new(ManualSelector::new(
            std::io::stdin().lock(),
            std::io::stdout(),
            config.walk_forward.shortlist,
        ))
    } else {
        Box::new(AutoSelector)
    };

    let report = run_walk_forward(
        &series,
        &grid,
        &evaluator,
        &optimizer,
        selector.as_mut(),
        &config.walk_forward_options(),
    )?;

    print_summary(&report);

    let written = write_reports(&report, output_dir)?;
    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &WfoReport) {
    println!();
    println!(
        "{:<8} {:<48} {:>10} {:>9} {:>9} {:>7}",
        "Window", "Chosen", "Return", "MaxDD", "Sharpe", "Trades"
    );
    for w in &report.windows {
        let n = w.split.window_index + 1;
        match &w.outcome {
            WindowOutcome::Validated {
                chosen,
                out_of_sample: o,
            } => println!(
                "{:<8} {:<48} {:>9.2}% {:>8.2}% {:>9.4} {:>7}",
                n,
                chosen.to_string(),
                o.total_return_pct,
                o.max_drawdown_pct,
                o.sharpe,
                o.total_trades
            ),
            WindowOutcome::NoAdmissibleParameters => {
                println!("{n:<8} no admissible parameter set")
            }
            WindowOutcome::ValidationFailed { chosen, reason } => {
                println!("{n:<8} {:<48} failed: {reason}", chosen.to_string())
            }
        }
    }
}

fn parse_params(raw: &[String]) -> Result<ParameterSet> {
    let mut values = BTreeMap::new();
    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            bail!("parameter '{item}' must be written as name=value");
        };
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("parameter '{name}' has a non-numeric value"))?;
        values.insert(name.trim().to_string(), value);
    }
    Ok(ParameterSet::new(values))
}

fn run_single(
    config_path: &Path,
    raw_params: &[String],
    synthetic: Option<usize>,
    seed: u64,
    timeline: Option<&Path>,
) -> Result<()> {
    let config = WfoConfig::from_file(config_path)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let params = parse_params(raw_params)?;
    let series = load_series(&config, synthetic, seed)?;

    let detailed = config.evaluator().evaluate_detailed(&series, &params)?;
    if params.is_empty() {
        println!("Parameters: (defaults)");
    } else {
        println!("Parameters: {params}");
    }
    print_stats(&detailed.result.stats);

    if let Some(path) = timeline {
        let csv = export_timeline_csv(&series, &detailed.run)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_stats(s: &PortfolioStats) {
    println!("Start:            {}", s.start);
    println!("End:              {}", s.end);
    println!("Total Return:     {:.2}%", s.total_return_pct);
    println!("Benchmark Return: {:.2}%", s.benchmark_return_pct);
    println!("Max Drawdown:     {:.2}%", s.max_drawdown_pct);
    match s.win_rate_pct {
        Some(w) => println!("Win Rate:         {w:.2}%"),
        None => println!("Win Rate:         n/a"),
    }
    println!("Sharpe Ratio:     {:.4}", s.sharpe);
    println!("Sortino Ratio:    {:.4}", s.sortino);
    println!("Calmar Ratio:     {:.4}", s.calmar);
    println!("Total Trades:     {}", s.total_trades);
}

fn run_splits(bars: usize, in_sample_fraction: f64, windows: usize) -> Result<()> {
    let splits = split_windows(bars, in_sample_fraction, windows)?;
    println!(
        "{:<8} {:>10} {:>10} {:>10} {:>10}",
        "Window", "IS start", "IS end", "OOS start", "OOS end"
    );
    for s in splits {
        println!(
            "{:<8} {:>10} {:>10} {:>10} {:>10}",
            s.window_index + 1,
            s.is_start,
            s.is_end,
            s.oos_start,
            s.oos_end
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_overrides() {
        let p = parse_params(&["window=20".into(), " atr_multiplier = 2.5".into()]).unwrap();
        assert_eq!(p.get("window"), Some(20.0));
        assert_eq!(p.get("atr_multiplier"), Some(2.5));
        assert!(parse_params(&["window".into()]).is_err());
        assert!(parse_params(&["window=abc".into()]).is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "revertlab",
            "run",
            "--config",
            "wfo.toml",
            "--param",
            "window=20",
            "--param",
            "atr_multiplier=3",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { params, .. } => assert_eq!(params.len(), 2),
            _ => panic!("expected run"),
        }
        assert!(Cli::try_parse_from(["revertlab", "splits", "--bars", "1000"]).is_ok());
    }
}
