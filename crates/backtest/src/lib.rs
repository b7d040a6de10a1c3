pub mod rolling;

pub use rolling::{BacktestConfig, PendingPosition, RollingBacktester};
