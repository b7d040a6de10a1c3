use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use common::{BookSnapshot, Config, Evaluation, Signal, SignalKind, Summary};

/// Horizon and cost model for [`RollingBacktester`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Price units per tick.
    pub tick_size: f64,
    /// Holding period before a position is marked and closed.
    pub horizon_seconds: f64,
    /// Entry fill adjustment, in ticks, against the position.
    pub slippage_ticks: f64,
    /// Recognized but not applied: positions always run to the horizon.
    pub exit_on_opposite_signal: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            tick_size: 0.1,
            horizon_seconds: 5.0,
            slippage_ticks: 0.0,
            exit_on_opposite_signal: false,
        }
    }
}

impl From<&Config> for BacktestConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            tick_size: cfg.tick_size,
            horizon_seconds: cfg.backtest.horizon_seconds,
            slippage_ticks: cfg.backtest.slippage_ticks,
            exit_on_opposite_signal: cfg.backtest.exit_on_opposite_signal,
        }
    }
}

/// An open hypothetical position waiting for its horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingPosition {
    pub signal: Signal,
    /// Entry mid with slippage already applied.
    pub entry_mid: f64,
}

/// Evaluates every signal as a fixed-horizon hypothetical trade.
///
/// Positions open at the (slippage-adjusted) mid of the snapshot that
/// carried the signal and close at the mid of the first snapshot at least
/// `horizon_seconds` later. Positions mature strictly in arrival order: only
/// the head of the queue is ever inspected, so a younger position never
/// closes before an older one.
///
/// The queue is unbounded. A mature head whose exit mid is undefined stays
/// at the head and is retried on every later snapshot.
#[derive(Debug, Clone)]
pub struct RollingBacktester {
    config: BacktestConfig,
    pending: VecDeque<PendingPosition>,
    pnl_ticks: Vec<f64>,
    buy_signals: usize,
    sell_signals: usize,
    dropped_signals: usize,
    head_stuck: bool,
}

impl RollingBacktester {
    pub fn new(config: BacktestConfig) -> Self {
        assert!(config.tick_size > 0.0, "tick_size must be > 0");
        assert!(config.horizon_seconds >= 0.0, "horizon_seconds must be >= 0");
        if config.exit_on_opposite_signal {
            info!("exit_on_opposite_signal is set but not applied; positions run to the horizon");
        }
        Self {
            config,
            pending: VecDeque::new(),
            pnl_ticks: Vec::new(),
            buy_signals: 0,
            sell_signals: 0,
            dropped_signals: 0,
            head_stuck: false,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn exit_on_opposite_signal(&self) -> bool {
        self.config.exit_on_opposite_signal
    }

    /// Open a position for `signal` at the snapshot's mid.
    ///
    /// If the mid is undefined the signal is dropped.
    pub fn on_signal(&mut self, snapshot: &BookSnapshot, signal: Signal) {
        let Some(mid) = snapshot.mid() else {
            self.dropped_signals += 1;
            debug!(ts = signal.ts, kind = %signal.kind, "Signal dropped: entry mid undefined");
            return;
        };

        // Slippage always works against the position.
        let slippage = self.config.slippage_ticks * self.config.tick_size;
        let entry_mid = match signal.kind {
            SignalKind::BuyPressure => {
                self.buy_signals += 1;
                mid + slippage
            }
            SignalKind::SellPressure => {
                self.sell_signals += 1;
                mid - slippage
            }
        };

        debug!(ts = signal.ts, kind = %signal.kind, entry = entry_mid, "Position opened");
        self.pending.push_back(PendingPosition { signal, entry_mid });
    }

    /// Close the oldest pending position if it has reached the horizon.
    pub fn on_snapshot(&mut self, snapshot: &BookSnapshot) -> Option<Evaluation> {
        let head = *self.pending.front()?;
        if snapshot.ts() - head.signal.ts < self.config.horizon_seconds {
            return None;
        }

        let Some(exit_mid) = snapshot.mid() else {
            if !self.head_stuck {
                warn!(
                    signal_ts = head.signal.ts,
                    ts = snapshot.ts(),
                    pending = self.pending.len(),
                    "Mature position waiting: exit mid undefined"
                );
                self.head_stuck = true;
            }
            return None;
        };

        let pnl_ticks =
            (exit_mid - head.entry_mid) * head.signal.kind.direction() / self.config.tick_size;
        self.pnl_ticks.push(pnl_ticks);
        self.pending.pop_front();
        self.head_stuck = false;

        let evaluation = Evaluation {
            ts: snapshot.ts(),
            signal_kind: head.signal.kind,
            entry_mid: head.entry_mid,
            exit_mid,
            pnl_ticks,
        };
        debug!(
            ts = evaluation.ts,
            kind = %evaluation.signal_kind,
            entry = evaluation.entry_mid,
            exit = evaluation.exit_mid,
            pnl_ticks = evaluation.pnl_ticks,
            "Position closed"
        );
        Some(evaluation)
    }

    /// Open positions, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingPosition> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Realized pnl of every closed position, in closing order.
    pub fn realized_pnl_ticks(&self) -> &[f64] {
        &self.pnl_ticks
    }

    pub fn summary(&self) -> Summary {
        let trades = self.pnl_ticks.len();
        let (avg_pnl_ticks, win_rate) = if trades == 0 {
            (0.0, 0.0)
        } else {
            let total: f64 = self.pnl_ticks.iter().sum();
            let wins = self.pnl_ticks.iter().filter(|&&p| p > 0.0).count();
            (total / trades as f64, wins as f64 / trades as f64)
        };
        Summary {
            trades,
            avg_pnl_ticks,
            win_rate,
            buy_signals: self.buy_signals,
            sell_signals: self.sell_signals,
            pending_positions: self.pending.len(),
            dropped_signals: self.dropped_signals,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
