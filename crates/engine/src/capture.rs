use std::io::Write;

use tracing::info;

use common::{Result, SnapshotRecord, SnapshotSource};

/// Persist snapshots from `source` as JSONL until `max_seconds` of stream
/// time have elapsed since the first one, or the source ends.
///
/// The snapshot that reaches the cutoff is still written. One-sided books
/// are not persisted. Returns the number of lines written.
pub async fn capture<S, W>(source: &mut S, out: &mut W, max_seconds: f64) -> Result<usize>
where
    S: SnapshotSource + ?Sized,
    W: Write + Send,
{
    let mut first_ts: Option<f64> = None;
    let mut written = 0usize;

    while let Some(snapshot) = source.next_snapshot().await? {
        if !snapshot.is_two_sided() {
            continue;
        }
        let start = *first_ts.get_or_insert(snapshot.ts());

        serde_json::to_writer(&mut *out, &SnapshotRecord::from(&snapshot))?;
        out.write_all(b"\n")?;
        written += 1;

        if snapshot.ts() - start >= max_seconds {
            break;
        }
    }

    out.flush()?;
    info!(lines = written, "Capture finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::replay::{PacedReplay, ReplayReader};

    fn log(timestamps: &[f64]) -> String {
        timestamps
            .iter()
            .map(|ts| format!("{{\"ts\":{ts},\"bids\":[[100.0,1.0]],\"asks\":[[101.0,2.0]]}}\n"))
            .collect()
    }

    #[tokio::test]
    async fn stops_at_cutoff_inclusive() {
        let mut source = PacedReplay::new(
            ReplayReader::new(Cursor::new(log(&[10.0, 11.0, 12.0, 13.0, 14.0]))),
            0.0,
        );
        let mut out = Vec::new();
        let n = capture(&mut source, &mut out, 2.0).await.unwrap();
        assert_eq!(n, 3);

        let text = String::from_utf8(out).unwrap();
        let records: Vec<SnapshotRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].ts, 12.0);
        assert_eq!(records[0].asks, vec![[101.0, 2.0]]);
    }

    #[tokio::test]
    async fn captured_lines_replay_back() {
        let mut source = PacedReplay::new(ReplayReader::new(Cursor::new(log(&[0.0, 0.5]))), 0.0);
        let mut out = Vec::new();
        capture(&mut source, &mut out, 60.0).await.unwrap();

        let replayed: Vec<_> = ReplayReader::new(Cursor::new(out))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].ts(), 0.5);
    }
}
