pub mod imbalance;
pub mod slope;
pub mod update_rate;

pub use imbalance::imbalance;
pub use slope::side_slope;
pub use update_rate::update_rate;
