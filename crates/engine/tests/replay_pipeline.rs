use std::path::PathBuf;

use common::Config;
use engine::{PacedReplay, Pipeline, ReplayReader, ReportWriter};

fn sample_log() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/sample/btcusdt_depth.jsonl")
}

#[tokio::test]
async fn sample_log_replays_end_to_end() {
    let cfg = Config::default();
    let mut source = PacedReplay::new(ReplayReader::open(sample_log()).unwrap(), 0.0);
    let mut report = ReportWriter::new(Vec::new()).unwrap();
    let mut pipeline = Pipeline::from_config(&cfg).unwrap();

    let summary = pipeline.run(&mut source, &mut report).await.unwrap();

    assert_eq!(report.rows(), 120);
    assert_eq!(pipeline.ticks(), 120);
    assert!(summary.buy_signals > 0, "bid-heavy stretch should fire");
    assert!(summary.sell_signals > 0, "ask-heavy stretch should fire");
    assert!(summary.trades > 0);
    assert_eq!(summary.dropped_signals, 0);
    // Every opened position is either closed or still queued.
    assert_eq!(
        summary.trades + summary.pending_positions,
        summary.buy_signals + summary.sell_signals
    );
    assert!((0.0..=1.0).contains(&summary.win_rate));
}

#[tokio::test]
async fn report_csv_has_header_and_one_row_per_snapshot() {
    let log = "\
{\"ts\":0.0,\"bids\":[[99.9,3.0]],\"asks\":[[100.1,1.0]]}
{\"ts\":0.1,\"bids\":[[99.9,3.0]],\"asks\":[]}
{\"ts\":0.2,\"bids\":[[99.9,3.0]],\"asks\":[[100.1,1.0]]}
";
    let mut source = PacedReplay::new(ReplayReader::new(std::io::Cursor::new(log)), 0.0);
    let mut report = ReportWriter::new(Vec::new()).unwrap();
    let mut pipeline = Pipeline::from_config(&Config::default()).unwrap();

    pipeline.run(&mut source, &mut report).await.unwrap();

    let text = String::from_utf8(report.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    // One-sided line is skipped by the reader.
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ts,mid,imbalance"));
    assert!(lines[2].starts_with("0.2,100,0.5,"));
}
