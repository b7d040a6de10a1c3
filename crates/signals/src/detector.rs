use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Config, FeatureVector, Signal, SignalKind};

/// Thresholds for [`ThresholdDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Absolute imbalance a reading must exceed to count as pressure.
    pub imbalance_threshold: f64,
    /// Readings below this update rate are treated as a quiet book.
    pub min_update_rate: f64,
    /// Consecutive same-kind readings required before a signal fires.
    pub confirm_n: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold: 0.12,
            min_update_rate: 2.0,
            confirm_n: 2,
        }
    }
}

impl From<&Config> for SignalConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            imbalance_threshold: cfg.signals.imbalance_threshold,
            min_update_rate: cfg.signals.min_update_rate,
            confirm_n: cfg.signals.confirm_n,
        }
    }
}

/// Classify one reading, ignoring the update-rate gate.
///
/// Buy pressure needs imbalance above the threshold with the bid side more
/// front-loaded than the ask side; sell pressure is the mirror image.
pub fn classify(fv: &FeatureVector, threshold: f64) -> Option<SignalKind> {
    if fv.imbalance > threshold && fv.bid_slope > fv.ask_slope {
        Some(SignalKind::BuyPressure)
    } else if fv.imbalance < -threshold && fv.ask_slope > fv.bid_slope {
        Some(SignalKind::SellPressure)
    } else {
        None
    }
}

/// Debounced threshold detector.
///
/// A signal fires only after `confirm_n` consecutive readings classify the
/// same way. Any gated or unclassified reading empties the run, and so does
/// firing: a persisting condition needs a fresh run of `confirm_n` readings
/// to fire again.
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    config: SignalConfig,
    run: VecDeque<SignalKind>,
}

impl ThresholdDetector {
    pub fn new(config: SignalConfig) -> Self {
        assert!(
            config.imbalance_threshold > 0.0,
            "imbalance_threshold must be > 0"
        );
        assert!(config.min_update_rate >= 0.0, "min_update_rate must be >= 0");
        assert!(config.confirm_n >= 1, "confirm_n must be >= 1");
        Self {
            config,
            run: VecDeque::with_capacity(config.confirm_n),
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Number of confirmations accumulated in the current run.
    pub fn pending_confirmations(&self) -> usize {
        self.run.len()
    }

    pub fn evaluate(&mut self, fv: &FeatureVector) -> Option<Signal> {
        if fv.update_rate < self.config.min_update_rate {
            self.run.clear();
            return None;
        }

        let Some(kind) = classify(fv, self.config.imbalance_threshold) else {
            self.run.clear();
            return None;
        };

        if self.run.len() == self.config.confirm_n {
            self.run.pop_front();
        }
        self.run.push_back(kind);

        if self.run.len() == self.config.confirm_n && self.run.iter().all(|&k| k == kind) {
            self.run.clear();
            let signal = Signal {
                ts: fv.ts,
                kind,
                strength: fv.imbalance.abs(),
            };
            debug!(ts = signal.ts, kind = %signal.kind, strength = signal.strength, "Signal confirmed");
            return Some(signal);
        }
        None
    }
}
