use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{info, warn};
use url::Url;

use common::{BookSnapshot, Error, Level, Result, SnapshotSource};

const STREAM_BASE_URL: &str = "wss://fstream.binance.com/stream";

/// Combined-stream URL for the 20-level, 100ms partial depth of `symbol`.
pub fn depth_stream_url(symbol: &str) -> String {
    format!(
        "{STREAM_BASE_URL}?streams={}@depth20@100ms",
        symbol.to_lowercase()
    )
}

/// Binance Futures partial-depth WebSocket stream for a single symbol.
///
/// Parses depth payloads into `BookSnapshot`s (best-first, truncated to
/// `levels`) and hands them to a bounded channel one at a time. Snapshots
/// with an empty side or a timestamp older than the last one sent are
/// dropped. Reconnects automatically with exponential backoff until the
/// receiving side is gone.
pub struct BinanceDepthStream {
    url: String,
    levels: usize,
    snapshot_tx: mpsc::Sender<BookSnapshot>,
    last_ts: Option<f64>,
}

impl BinanceDepthStream {
    pub fn new(url: impl Into<String>, levels: usize, snapshot_tx: mpsc::Sender<BookSnapshot>) -> Self {
        Self {
            url: url.into(),
            levels,
            snapshot_tx,
            last_ts: None,
        }
    }

    /// Spawn the stream task and return the consuming end as a [`LiveFeed`].
    pub fn spawn(url: impl Into<String>, levels: usize) -> (LiveFeed, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1024);
        let stream = Self::new(url, levels, tx);
        let handle = tokio::spawn(stream.run());
        (LiveFeed::new(rx), handle)
    }

    /// Run the stream loop, reconnecting on failure.
    /// Returns once the receiver has been dropped.
    pub async fn run(mut self) {
        let mut backoff = Duration::from_secs(1);
        const MAX_BACKOFF: Duration = Duration::from_secs(60);

        loop {
            info!(url = %self.url, "Connecting to Binance depth stream");
            match self.connect_once().await {
                Ok(()) => {
                    if self.snapshot_tx.is_closed() {
                        info!("Snapshot receiver dropped, depth stream stopping");
                        return;
                    }
                    info!(url = %self.url, "Depth stream closed cleanly");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    backoff = Duration::from_secs(1);
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, backoff = ?backoff, "Depth stream error, reconnecting");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    async fn connect_once(&mut self) -> Result<()> {
        let url = Url::parse(&self.url).map_err(|e| Error::WebSocket(e.to_string()))?;
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        let (_, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| Error::WebSocket(e.to_string()))?;

            if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                match parse_depth_event(&text, self.levels) {
                    Ok(Some(snapshot)) => {
                        if !self.admit(&snapshot) {
                            continue;
                        }
                        if self.snapshot_tx.send(snapshot).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {} // control message or one-sided book
                    Err(e) => {
                        warn!(error = %e, "Failed to parse depth event");
                    }
                }
            }
        }

        Ok(())
    }

    /// Timestamp gate: a snapshot older than the last admitted one is dropped.
    /// Equal timestamps pass. The last timestamp is kept across reconnects.
    fn admit(&mut self, snapshot: &BookSnapshot) -> bool {
        if self.last_ts.is_some_and(|last| snapshot.ts() < last) {
            warn!(ts = snapshot.ts(), last = ?self.last_ts, "Out-of-order depth snapshot dropped");
            return false;
        }
        self.last_ts = Some(snapshot.ts());
        true
    }
}

/// Consuming end of a [`BinanceDepthStream`].
pub struct LiveFeed {
    rx: mpsc::Receiver<BookSnapshot>,
}

impl LiveFeed {
    pub fn new(rx: mpsc::Receiver<BookSnapshot>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl SnapshotSource for LiveFeed {
    async fn next_snapshot(&mut self) -> Result<Option<BookSnapshot>> {
        Ok(self.rx.recv().await)
    }
}

// ─── Binance depth JSON parsing ──────────────────────────────────────────────

#[derive(Deserialize)]
struct DepthPayload {
    #[serde(rename = "E")]
    event_time_ms: Option<i64>,
    #[serde(rename = "T")]
    transaction_time_ms: Option<i64>,
    #[serde(rename = "b", default)]
    bids: Vec<(String, String)>,
    #[serde(rename = "a", default)]
    asks: Vec<(String, String)>,
}

/// Parse a combined-stream (`{"stream": .., "data": {..}}`) or raw depth
/// payload. Returns `None` for messages without both book sides.
pub fn parse_depth_event(text: &str, levels: usize) -> Result<Option<BookSnapshot>> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(data) = value.get_mut("data") {
        value = data.take();
    }
    let payload: DepthPayload = serde_json::from_value(value)?;
    if payload.bids.is_empty() || payload.asks.is_empty() {
        return Ok(None);
    }

    let ts_ms = payload
        .event_time_ms
        .or(payload.transaction_time_ms)
        .unwrap_or(0);
    let ts = ts_ms as f64 / 1000.0;

    let mut bids = parse_levels(&payload.bids)?;
    let mut asks = parse_levels(&payload.asks)?;
    bids.sort_by(|a, b| b.price.total_cmp(&a.price));
    asks.sort_by(|a, b| a.price.total_cmp(&b.price));
    bids.truncate(levels);
    asks.truncate(levels);

    BookSnapshot::new(ts, bids, asks).map(Some)
}

fn parse_levels(raw: &[(String, String)]) -> Result<Vec<Level>> {
    raw.iter()
        .map(|(price, qty)| {
            let price = price
                .parse::<f64>()
                .map_err(|e| Error::InvalidSnapshot(format!("bad price '{price}': {e}")))?;
            let qty = qty
                .parse::<f64>()
                .map_err(|e| Error::InvalidSnapshot(format!("bad quantity '{qty}': {e}")))?;
            Ok(Level::new(price, qty))
        })
        .collect()
}
