use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{BookSnapshot, Config, FeatureVector};

use crate::indicators::{imbalance, side_slope, update_rate};

/// Window sizes and depth used by [`FeatureEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Capacity of the retained snapshot history.
    pub window_size: usize,
    /// Number of recent timestamps used for the update-rate estimate.
    pub update_rate_window: usize,
    /// Book levels per side that feed imbalance and slope.
    pub depth_levels: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            update_rate_window: 30,
            depth_levels: 5,
        }
    }
}

impl From<&Config> for FeatureConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            window_size: cfg.features.window_size,
            update_rate_window: cfg.features.update_rate_window,
            depth_levels: cfg.levels,
        }
    }
}

/// Turns a snapshot stream into feature vectors, one per snapshot.
///
/// Keeps two bounded windows: recent snapshots (history kept for extension,
/// not read by the current features) and recent timestamps for the update
/// rate. Both evict oldest-first once full.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureConfig,
    history: VecDeque<BookSnapshot>,
    timestamps: VecDeque<f64>,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        debug!(?config, "FeatureEngine initialized");
        Self {
            config,
            history: VecDeque::with_capacity(config.window_size),
            timestamps: VecDeque::with_capacity(config.update_rate_window),
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Ingest one snapshot and compute its feature vector.
    ///
    /// Never fails: degenerate inputs produce neutral 0.0 features.
    pub fn push(&mut self, snapshot: &BookSnapshot) -> FeatureVector {
        push_bounded(&mut self.history, snapshot.clone(), self.config.window_size);
        push_bounded(&mut self.timestamps, snapshot.ts(), self.config.update_rate_window);

        let depth = self.config.depth_levels;
        FeatureVector {
            ts: snapshot.ts(),
            imbalance: imbalance(snapshot, depth),
            bid_slope: side_slope(snapshot.bids(), depth),
            ask_slope: side_slope(snapshot.asks(), depth),
            update_rate: update_rate(self.timestamps.iter().copied()),
        }
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &BookSnapshot> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn timestamps_len(&self) -> usize {
        self.timestamps.len()
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(item);
}
