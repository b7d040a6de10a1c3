use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Where snapshots come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Replay,
    Live,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Replay => write!(f, "replay"),
            Mode::Live => write!(f, "live"),
        }
    }
}

/// Top-level run configuration (TOML).
///
/// Example `config/default.toml`:
/// ```toml
/// mode = "replay"
/// symbol = "BTCUSDT"
/// tick_size = 0.1
/// levels = 5
///
/// [replay]
/// file = "data/sample/btcusdt_depth.jsonl"
///
/// [signals]
/// imbalance_threshold = 0.12
/// confirm_n = 2
/// ```
/// Every key is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub symbol: String,
    pub venue: String,
    /// Price units per tick; pnl is reported in multiples of this.
    pub tick_size: f64,
    pub price_decimals: u32,
    /// Depth K: book levels used for imbalance and slope.
    pub levels: usize,
    pub ws_url: String,
    pub replay: ReplaySection,
    pub features: FeaturesSection,
    pub signals: SignalsSection,
    pub backtest: BacktestSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    pub file: String,
    /// Replay speed multiplier; 0 disables pacing.
    pub speedup: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesSection {
    pub window_size: usize,
    pub update_rate_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsSection {
    pub imbalance_threshold: f64,
    pub min_update_rate: f64,
    pub confirm_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub horizon_seconds: f64,
    pub slippage_ticks: f64,
    /// Recognized but not applied by the backtester.
    pub exit_on_opposite_signal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Replay,
            symbol: "BTCUSDT".to_string(),
            venue: "binance-futures".to_string(),
            tick_size: 0.1,
            price_decimals: 1,
            levels: 5,
            ws_url: "wss://fstream.binance.com/stream?streams=btcusdt@depth20@100ms".to_string(),
            replay: ReplaySection::default(),
            features: FeaturesSection::default(),
            signals: SignalsSection::default(),
            backtest: BacktestSection::default(),
        }
    }
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            file: "data/sample/btcusdt_depth.jsonl".to_string(),
            speedup: 0.0,
        }
    }
}

impl Default for FeaturesSection {
    fn default() -> Self {
        Self {
            window_size: 20,
            update_rate_window: 30,
        }
    }
}

impl Default for SignalsSection {
    fn default() -> Self {
        Self {
            imbalance_threshold: 0.12,
            min_update_rate: 2.0,
            confirm_n: 2,
        }
    }
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            horizon_seconds: 5.0,
            slippage_ticks: 0.0,
            exit_on_opposite_signal: false,
        }
    }
}

impl Config {
    /// Load from a TOML file, apply environment overrides, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config at '{}': {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        info!(path = %path.display(), mode = %cfg.mode, symbol = %cfg.symbol, "Configuration loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override selected keys from `OBP_*` environment variables.
    /// Loads `.env` if present.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        if let Some(mode) = optional_env("OBP_MODE") {
            self.mode = match mode.to_lowercase().as_str() {
                "replay" => Mode::Replay,
                "live" => Mode::Live,
                other => {
                    return Err(Error::Config(format!(
                        "OBP_MODE must be 'replay' or 'live', got: '{other}'"
                    )))
                }
            };
        }
        if let Some(symbol) = optional_env("OBP_SYMBOL") {
            self.symbol = symbol;
        }
        if let Some(url) = optional_env("OBP_WS_URL") {
            self.ws_url = url;
        }
        if let Some(file) = optional_env("OBP_REPLAY_FILE") {
            self.replay.file = file;
        }
        if let Some(speedup) = optional_env("OBP_REPLAY_SPEEDUP") {
            self.replay.speedup = speedup.parse().map_err(|_| {
                Error::Config(format!("OBP_REPLAY_SPEEDUP is not a number: '{speedup}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tick_size > 0.0) {
            return Err(Error::Config(format!("tick_size must be > 0, got {}", self.tick_size)));
        }
        if self.levels < 1 {
            return Err(Error::Config("levels must be >= 1".to_string()));
        }
        if !(self.signals.imbalance_threshold > 0.0) {
            return Err(Error::Config(format!(
                "signals.imbalance_threshold must be > 0, got {}",
                self.signals.imbalance_threshold
            )));
        }
        if !(self.signals.min_update_rate >= 0.0) {
            return Err(Error::Config(format!(
                "signals.min_update_rate must be >= 0, got {}",
                self.signals.min_update_rate
            )));
        }
        if self.signals.confirm_n < 1 {
            return Err(Error::Config("signals.confirm_n must be >= 1".to_string()));
        }
        if !(self.backtest.horizon_seconds >= 0.0) {
            return Err(Error::Config(format!(
                "backtest.horizon_seconds must be >= 0, got {}",
                self.backtest.horizon_seconds
            )));
        }
        if !self.backtest.slippage_ticks.is_finite() {
            return Err(Error::Config("backtest.slippage_ticks must be finite".to_string()));
        }
        if !(self.replay.speedup >= 0.0) {
            return Err(Error::Config(format!(
                "replay.speedup must be >= 0, got {}",
                self.replay.speedup
            )));
        }
        Ok(())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
