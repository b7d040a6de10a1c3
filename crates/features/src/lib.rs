pub mod engine;
pub mod indicators;

pub use engine::{FeatureConfig, FeatureEngine};
pub use indicators::{imbalance, side_slope, update_rate};
