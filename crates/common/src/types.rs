use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub qty: f64,
}

impl Level {
    pub fn new(price: f64, qty: f64) -> Self {
        Self { price, qty }
    }
}

impl From<[f64; 2]> for Level {
    fn from([price, qty]: [f64; 2]) -> Self {
        Self { price, qty }
    }
}

/// Point-in-time depth view of a single-symbol order book.
///
/// Bids are sorted descending by price and asks ascending, so the best level
/// of each side is always at index 0; repeated prices are allowed. The
/// ordering and the price/quantity bounds are checked once in
/// [`BookSnapshot::new`]; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    ts: f64,
    bids: Vec<Level>,
    asks: Vec<Level>,
}

impl BookSnapshot {
    pub fn new(ts: f64, bids: Vec<Level>, asks: Vec<Level>) -> Result<Self> {
        if !ts.is_finite() {
            return Err(Error::InvalidSnapshot(format!("non-finite timestamp {ts}")));
        }
        check_side("bid", &bids, |prev, next| next <= prev)?;
        check_side("ask", &asks, |prev, next| next >= prev)?;
        Ok(Self { ts, bids, asks })
    }

    /// Sort both sides best-first, then validate.
    pub fn from_unsorted(ts: f64, mut bids: Vec<Level>, mut asks: Vec<Level>) -> Result<Self> {
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        Self::new(ts, bids, asks)
    }

    pub fn ts(&self) -> f64 {
        self.ts
    }

    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    /// `None` when either side of the book is empty.
    pub fn mid(&self) -> Option<f64> {
        Some((self.best_bid()? + self.best_ask()?) / 2.0)
    }

    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// True when both sides carry at least one level.
    pub fn is_two_sided(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }
}

fn check_side(side: &str, levels: &[Level], ordered: impl Fn(f64, f64) -> bool) -> Result<()> {
    for (i, level) in levels.iter().enumerate() {
        if !(level.price.is_finite() && level.price > 0.0) {
            return Err(Error::InvalidSnapshot(format!(
                "{side} level {i} has non-positive price {}",
                level.price
            )));
        }
        if !(level.qty.is_finite() && level.qty >= 0.0) {
            return Err(Error::InvalidSnapshot(format!(
                "{side} level {i} has negative quantity {}",
                level.qty
            )));
        }
        if i > 0 && !ordered(levels[i - 1].price, level.price) {
            return Err(Error::InvalidSnapshot(format!(
                "{side} levels are not sorted best-first at level {i}"
            )));
        }
    }
    Ok(())
}

/// Wire form of one persisted snapshot line:
/// `{"ts": 1.0, "bids": [[price, qty], ...], "asks": [[price, qty], ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub ts: f64,
    pub bids: Vec<[f64; 2]>,
    pub asks: Vec<[f64; 2]>,
}

impl TryFrom<SnapshotRecord> for BookSnapshot {
    type Error = Error;

    fn try_from(record: SnapshotRecord) -> Result<Self> {
        BookSnapshot::new(
            record.ts,
            record.bids.into_iter().map(Level::from).collect(),
            record.asks.into_iter().map(Level::from).collect(),
        )
    }
}

impl From<&BookSnapshot> for SnapshotRecord {
    fn from(snap: &BookSnapshot) -> Self {
        Self {
            ts: snap.ts,
            bids: snap.bids.iter().map(|l| [l.price, l.qty]).collect(),
            asks: snap.asks.iter().map(|l| [l.price, l.qty]).collect(),
        }
    }
}

/// Microstructure features derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ts: f64,
    /// Normalized bid/ask volume difference over the top K levels, in [-1, 1].
    pub imbalance: f64,
    pub bid_slope: f64,
    pub ask_slope: f64,
    /// Snapshot arrival frequency in events per second.
    pub update_rate: f64,
}

/// Direction of book pressure behind a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    BuyPressure,
    SellPressure,
}

impl SignalKind {
    /// +1 for buy pressure, -1 for sell pressure.
    pub fn direction(self) -> f64 {
        match self {
            SignalKind::BuyPressure => 1.0,
            SignalKind::SellPressure => -1.0,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::BuyPressure => write!(f, "BUY_PRESSURE"),
            SignalKind::SellPressure => write!(f, "SELL_PRESSURE"),
        }
    }
}

/// Confirmed directional signal emitted by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ts: f64,
    pub kind: SignalKind,
    /// Absolute imbalance at confirmation, in [0, 1].
    pub strength: f64,
}

/// A closed hypothetical position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Timestamp of the snapshot that closed the position.
    pub ts: f64,
    pub signal_kind: SignalKind,
    /// Entry mid after slippage.
    pub entry_mid: f64,
    pub exit_mid: f64,
    pub pnl_ticks: f64,
}

/// Aggregate backtest statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub trades: usize,
    pub avg_pnl_ticks: f64,
    pub win_rate: f64,
    pub buy_signals: usize,
    pub sell_signals: usize,
    /// Positions still waiting for horizon maturation.
    pub pending_positions: usize,
    /// Signals discarded because the entry mid was undefined.
    pub dropped_signals: usize,
}
