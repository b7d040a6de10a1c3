use backtest::{BacktestConfig, RollingBacktester};
use common::{BookSnapshot, Level, Signal, SignalKind};
use proptest::prelude::*;

fn book(ts: f64, mid: f64) -> BookSnapshot {
    BookSnapshot::new(
        ts,
        vec![Level::new(mid - 0.5, 1.0)],
        vec![Level::new(mid + 0.5, 1.0)],
    )
    .unwrap()
}

fn arb_kind() -> impl Strategy<Value = SignalKind> {
    prop_oneof![Just(SignalKind::BuyPressure), Just(SignalKind::SellPressure)]
}

proptest! {
    /// Pnl is positive exactly when price moved the favored way past the
    /// slippage-adjusted entry.
    #[test]
    fn pnl_sign_follows_price_move(
        entry in 10.0f64..10_000.0,
        exit in 10.0f64..10_000.0,
        kind in arb_kind(),
        slippage_ticks in 0.0f64..5.0,
        tick_size in prop_oneof![Just(0.01), Just(0.1), Just(1.0)],
    ) {
        let mut bt = RollingBacktester::new(BacktestConfig {
            tick_size,
            horizon_seconds: 1.0,
            slippage_ticks,
            exit_on_opposite_signal: false,
        });
        bt.on_signal(&book(0.0, entry), Signal { ts: 0.0, kind, strength: 0.3 });
        let ev = bt.on_snapshot(&book(1.0, exit)).expect("mature");
        let favorable = (ev.exit_mid - ev.entry_mid) * kind.direction() > 0.0;
        prop_assert_eq!(ev.pnl_ticks > 0.0, favorable);
        prop_assert!(ev.entry_mid * kind.direction() >= book(0.0, entry).mid().unwrap() * kind.direction() - 1e-9);
    }

    /// Evaluations come out in the order their signals went in.
    #[test]
    fn queue_never_reorders(
        steps in prop::collection::vec((0.0f64..2.0, any::<bool>(), arb_kind()), 1..100),
        horizon in 0.0f64..10.0,
    ) {
        let mut bt = RollingBacktester::new(BacktestConfig {
            tick_size: 0.1,
            horizon_seconds: horizon,
            slippage_ticks: 0.0,
            exit_on_opposite_signal: false,
        });
        let mut ts = 0.0;
        let mut opened: Vec<f64> = Vec::new();
        let mut closed_signal_ts: Vec<f64> = Vec::new();

        for (gap, fire, kind) in steps {
            ts += gap;
            let snap = book(ts, 100.0 + ts);
            if fire {
                bt.on_signal(&snap, Signal { ts, kind, strength: 0.5 });
                opened.push(ts);
            }
            if let Some(ev) = bt.on_snapshot(&snap) {
                let head_ts = opened[closed_signal_ts.len()];
                prop_assert!(ev.ts - head_ts >= horizon);
                closed_signal_ts.push(head_ts);
            }
        }

        // The remaining queue is exactly the unclosed suffix.
        prop_assert_eq!(bt.pending_len(), opened.len() - closed_signal_ts.len());
        let remaining: Vec<f64> = bt.pending().map(|p| p.signal.ts).collect();
        prop_assert_eq!(&remaining[..], &opened[closed_signal_ts.len()..]);
        prop_assert_eq!(bt.summary().trades, closed_signal_ts.len());
    }
}
