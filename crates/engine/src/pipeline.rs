use std::io::Write;

use tracing::info;

use backtest::{BacktestConfig, RollingBacktester};
use common::{BookSnapshot, Config, Evaluation, FeatureVector, Result, Signal, SnapshotSource, Summary};
use features::{FeatureConfig, FeatureEngine};
use signals::{SignalConfig, ThresholdDetector};

use crate::report::ReportWriter;

/// Everything the pipeline derived from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub ts: f64,
    pub mid: Option<f64>,
    pub features: FeatureVector,
    pub signal: Option<Signal>,
    pub evaluation: Option<Evaluation>,
    /// Running sum of realized pnl in ticks, including this tick's evaluation.
    pub cum_pnl_ticks: f64,
}

/// One single-symbol pipeline: features, then detector, then backtester.
///
/// Each snapshot feeds the feature engine; its vector feeds the detector; a
/// confirmed signal opens a position at that same snapshot; finally the
/// snapshot is offered to the backtester to mature the oldest position.
pub struct Pipeline {
    features: FeatureEngine,
    detector: ThresholdDetector,
    backtester: RollingBacktester,
    cum_pnl_ticks: f64,
    ticks: usize,
}

impl Pipeline {
    /// Panics if `signals` or `backtest` is out of range; see [`Pipeline::from_config`].
    pub fn new(features: FeatureConfig, signals: SignalConfig, backtest: BacktestConfig) -> Self {
        Self {
            features: FeatureEngine::new(features),
            detector: ThresholdDetector::new(signals),
            backtester: RollingBacktester::new(backtest),
            cum_pnl_ticks: 0.0,
            ticks: 0,
        }
    }

    /// Build from a run config, validating it first so the stage
    /// constructors never see out-of-range values.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(
            FeatureConfig::from(cfg),
            SignalConfig::from(cfg),
            BacktestConfig::from(cfg),
        ))
    }

    pub fn step(&mut self, snapshot: &BookSnapshot) -> Tick {
        let features = self.features.push(snapshot);
        let signal = self.detector.evaluate(&features);
        if let Some(sig) = signal {
            info!(ts = sig.ts, kind = %sig.kind, strength = sig.strength, "Signal");
            self.backtester.on_signal(snapshot, sig);
        }
        let evaluation = self.backtester.on_snapshot(snapshot);
        if let Some(ev) = &evaluation {
            self.cum_pnl_ticks += ev.pnl_ticks;
        }
        self.ticks += 1;

        Tick {
            ts: snapshot.ts(),
            mid: snapshot.mid(),
            features,
            signal,
            evaluation,
            cum_pnl_ticks: self.cum_pnl_ticks,
        }
    }

    /// Drive `source` to exhaustion, writing one report row per snapshot.
    pub async fn run<S, W>(&mut self, source: &mut S, report: &mut ReportWriter<W>) -> Result<Summary>
    where
        S: SnapshotSource + ?Sized,
        W: Write,
    {
        while let Some(snapshot) = source.next_snapshot().await? {
            let tick = self.step(&snapshot);
            report.write_tick(&tick)?;
        }
        report.flush()?;

        let summary = self.summary();
        info!(
            ticks = self.ticks,
            trades = summary.trades,
            avg_pnl_ticks = summary.avg_pnl_ticks,
            win_rate = summary.win_rate,
            "Pipeline finished"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> Summary {
        self.backtester.summary()
    }

    pub fn cum_pnl_ticks(&self) -> f64 {
        self.cum_pnl_ticks
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn backtester(&self) -> &RollingBacktester {
        &self.backtester
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Error, Level, SignalKind};

    fn pressured_book(ts: f64, mid: f64) -> BookSnapshot {
        // Heavy, front-loaded bid; thin ask.
        BookSnapshot::new(
            ts,
            vec![Level::new(mid - 0.05, 9.0), Level::new(mid - 0.15, 1.0)],
            vec![Level::new(mid + 0.05, 1.0), Level::new(mid + 0.15, 1.0)],
        )
        .unwrap()
    }

    fn pipeline(confirm_n: usize) -> Pipeline {
        Pipeline::new(
            FeatureConfig {
                window_size: 5,
                update_rate_window: 5,
                depth_levels: 2,
            },
            SignalConfig {
                imbalance_threshold: 0.12,
                min_update_rate: 0.5,
                confirm_n,
            },
            BacktestConfig {
                tick_size: 0.1,
                horizon_seconds: 2.0,
                slippage_ticks: 0.0,
                exit_on_opposite_signal: false,
            },
        )
    }

    #[test]
    fn signal_opens_position_and_horizon_closes_it() {
        let mut p = pipeline(2);
        let t0 = p.step(&pressured_book(0.0, 100.0));
        assert!(t0.signal.is_none(), "rate gate holds the first tick");

        let t1 = p.step(&pressured_book(1.0, 100.0));
        assert!(t1.signal.is_none(), "one confirmation so far");

        let t2 = p.step(&pressured_book(2.0, 100.0));
        let sig = t2.signal.expect("second confirmation fires");
        assert_eq!(sig.kind, SignalKind::BuyPressure);
        assert_eq!(p.backtester().pending_len(), 1);

        p.step(&pressured_book(3.0, 100.2));
        let t4 = p.step(&pressured_book(4.0, 100.3));
        let ev = t4.evaluation.expect("matured after two seconds");
        assert!((ev.pnl_ticks - 3.0).abs() < 1e-9);
        assert!((t4.cum_pnl_ticks - 3.0).abs() < 1e-9);
        assert_eq!(p.ticks(), 5);
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let cfg = Config::from_toml_str("tick_size = 0.0").unwrap();
        assert!(matches!(Pipeline::from_config(&cfg), Err(Error::Config(_))));

        let cfg = Config::from_toml_str("[signals]\nconfirm_n = 0").unwrap();
        assert!(matches!(Pipeline::from_config(&cfg), Err(Error::Config(_))));

        assert!(Pipeline::from_config(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn run_writes_a_row_per_snapshot() {
        use crate::replay::{PacedReplay, ReplayReader};
        use std::io::Cursor;

        let log: String = (0..6)
            .map(|i| {
                format!(
                    "{{\"ts\":{i},\"bids\":[[99.95,9.0],[99.85,1.0]],\"asks\":[[100.05,1.0],[100.15,1.0]]}}\n"
                )
            })
            .collect();
        let mut source = PacedReplay::new(ReplayReader::new(Cursor::new(log)), 0.0);
        let mut report = ReportWriter::new(Vec::new()).unwrap();
        let mut p = pipeline(2);

        let summary = p.run(&mut source, &mut report).await.unwrap();
        assert_eq!(report.rows(), 6);
        // Signals at ts 2 and 4; only the first reaches its horizon.
        assert_eq!(summary.buy_signals, 2);
        assert_eq!(summary.trades, 1);
        assert_eq!(summary.pending_positions, 1);
        assert_eq!(summary.avg_pnl_ticks, 0.0);
    }
}
