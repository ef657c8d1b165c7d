//! RevertLab Runner — walk-forward optimization around the core engine.
//!
//! This crate builds on `revertlab-core` to provide:
//! - The backtest collaborator contract and a reference signal portfolio
//! - Performance metrics over equity curves
//! - Parameter grids and the parallel grid-search optimizer
//! - Automatic and interactive parameter selection
//! - Walk-forward splitting and the window-sequential driver
//! - TOML configuration, CSV/synthetic data loading, and report export

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid;
pub mod metrics;
pub mod params;
pub mod portfolio;
pub mod runner;
pub mod selection;
pub mod walk_forward;

pub use backtest::{
    BacktestEngine, BacktestError, BarFrequency, PortfolioSettings, PortfolioStats, SignalInput,
};
pub use config::{ConfigError, WfoConfig};
pub use data_loader::{generate_synthetic, load_csv, parse_csv, LoadError};
pub use grid::{CombinationFailure, GridOutcome, GridSearchOptimizer, OptimizerError};
pub use params::{GridError, ParamAxis, ParamGrid, ParameterSet};
pub use portfolio::SignalPortfolio;
pub use runner::{BacktestResult, DetailedRun, Evaluate, RunError, StrategyEvaluator, SCHEMA_VERSION};
pub use selection::{AutoSelector, ManualSelector, SelectionError, Selector};
pub use walk_forward::{
    run_walk_forward, split_windows, SplitError, WalkForwardError, WalkForwardOptions, WfoReport,
    WindowOutcome, WindowReport, WindowSplit,
};
