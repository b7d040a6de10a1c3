pub mod detector;

pub use detector::{classify, SignalConfig, ThresholdDetector};
