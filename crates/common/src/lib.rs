pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::{Config, Mode};
pub use error::{Error, Result};
pub use source::SnapshotSource;
pub use types::*;
