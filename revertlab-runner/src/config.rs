//! Walk-forward run configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! path = "prices.csv"
//! time_column = "timestamp"
//!
//! [walk_forward]
//! in_sample_fraction = 0.8
//! windows = 16
//!
//! [portfolio]
//! fees = 0.0005
//! freq = "30m"
//!
//! [strategy]
//! filter = "momentum"
//! stop = "atr_trailing"
//!
//! [grid]
//! window = { start = 15, stop = 70, step = 5 }
//! atr_multiplier = [1, 2, 3, 4, 5, 6, 7, 8]
//! ```
//!
//! Every section is optional; omitted values take the defaults below.
//! `validate()` runs before any data is touched.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use revertlab_core::components::composition::PARAMETER_NAMES;
use revertlab_core::components::{CompositionError, FilterKind, StopKind, StrategyParams};

use crate::backtest::{BacktestError, PortfolioSettings};
use crate::params::{GridError, ParamAxis, ParamGrid};
use crate::runner::StrategyEvaluator;
use crate::walk_forward::WalkForwardOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid [walk_forward]: {0}")]
    WalkForward(String),
    #[error("invalid [portfolio]: {0}")]
    Portfolio(#[from] BacktestError),
    #[error("invalid strategy parameter: {0}")]
    Parameter(#[from] CompositionError),
    #[error("invalid [grid]: {0}")]
    Grid(#[from] GridError),
    #[error("no data path configured")]
    MissingDataPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV price file. Relative paths resolve against the config file.
    pub path: Option<PathBuf>,
    pub time_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            time_column: "timestamp".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub in_sample_fraction: f64,
    pub windows: usize,
    /// Grid worker threads; hardware concurrency when unset.
    pub workers: Option<usize>,
    /// In-sample results kept per window and shown to a manual selector.
    pub shortlist: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        let options = WalkForwardOptions::default();
        Self {
            in_sample_fraction: options.in_sample_fraction,
            windows: options.windows,
            workers: None,
            shortlist: options.shortlist,
        }
    }
}

/// Filter and stop choice plus base values for parameters the grid does
/// not sweep.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub filter: FilterKind,
    pub stop: StopKind,
    #[serde(flatten)]
    pub params: StrategyParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WfoConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub walk_forward: WalkForwardConfig,
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default = "default_grid")]
    pub grid: BTreeMap<String, ParamAxis>,
}

impl Default for WfoConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            walk_forward: WalkForwardConfig::default(),
            portfolio: PortfolioSettings::default(),
            strategy: StrategyConfig::default(),
            grid: default_grid(),
        }
    }
}

/// window 15..=70 step 5, desired_return 0.005..=0.025 step 0.0025,
/// atr_multiplier 1..=8.
pub fn default_grid() -> BTreeMap<String, ParamAxis> {
    let mut grid = BTreeMap::new();
    grid.insert("window".to_string(), ParamAxis::range(15.0, 70.0, 5.0));
    grid.insert(
        "desired_return".to_string(),
        ParamAxis::range(0.005, 0.025, 0.0025),
    );
    grid.insert("atr_multiplier".to_string(), ParamAxis::range(1.0, 8.0, 1.0));
    grid
}

impl WfoConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(data_path), Some(dir)) = (config.data.path.as_mut(), path.parent()) {
            if data_path.is_relative() {
                *data_path = dir.join(&*data_path);
            }
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let wf = &self.walk_forward;
        if !(wf.in_sample_fraction.is_finite()
            && wf.in_sample_fraction > 0.0
            && wf.in_sample_fraction < 1.0)
        {
            return Err(ConfigError::WalkForward(format!(
                "in_sample_fraction must be strictly between 0 and 1, got {}",
                wf.in_sample_fraction
            )));
        }
        if wf.windows == 0 {
            return Err(ConfigError::WalkForward("windows must be at least 1".into()));
        }
        if wf.workers == Some(0) {
            return Err(ConfigError::WalkForward("workers must be at least 1".into()));
        }
        if wf.shortlist == 0 {
            return Err(ConfigError::WalkForward("shortlist must be at least 1".into()));
        }

        self.portfolio.validate()?;
        self.strategy.params.validate()?;

        let grid = self.grid()?;
        for name in grid.names() {
            if !PARAMETER_NAMES.contains(&name) {
                return Err(CompositionError::UnknownParameter(name.to_string()).into());
            }
            for &value in grid.axis(name).unwrap_or_default() {
                let single = BTreeMap::from([(name.to_string(), value)]);
                self.strategy.params.with_overrides(&single)?;
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<ParamGrid, ConfigError> {
        Ok(ParamGrid::from_axes(&self.grid)?)
    }

    pub fn data_path(&self) -> Result<&Path, ConfigError> {
        self.data.path.as_deref().ok_or(ConfigError::MissingDataPath)
    }

    pub fn walk_forward_options(&self) -> WalkForwardOptions {
        WalkForwardOptions {
            in_sample_fraction: self.walk_forward.in_sample_fraction,
            windows: self.walk_forward.windows,
            shortlist: self.walk_forward.shortlist,
        }
    }

    pub fn evaluator(&self) -> StrategyEvaluator {
        StrategyEvaluator::new(
            self.strategy.filter,
            self.strategy.stop,
            self.strategy.params.clone(),
            self.portfolio.clone(),
        )
    }
}
