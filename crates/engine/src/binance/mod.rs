pub mod stream;

pub use stream::{depth_stream_url, parse_depth_event, BinanceDepthStream, LiveFeed};
