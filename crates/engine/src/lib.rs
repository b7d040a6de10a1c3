pub mod binance;
pub mod capture;
pub mod pipeline;
pub mod replay;
pub mod report;

pub use binance::{depth_stream_url, BinanceDepthStream, LiveFeed};
pub use capture::capture;
pub use pipeline::{Pipeline, Tick};
pub use replay::{PacedReplay, ReplayReader};
pub use report::ReportWriter;
