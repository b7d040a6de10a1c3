use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use common::{BookSnapshot, Error, Result, SnapshotRecord, SnapshotSource};

/// Reads a JSONL snapshot log, one `SnapshotRecord` per line.
///
/// Blank lines are ignored and records missing either book side are skipped.
/// A line that is not valid JSON, or that breaks the snapshot invariants, is
/// a fatal `Error::Replay` carrying its 1-based line number.
pub struct ReplayReader<R> {
    lines: Lines<R>,
    line_no: usize,
    skipped: usize,
}

impl ReplayReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "Replay file opened");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Records skipped so far because a book side was empty.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<BookSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match parse_line(self.line_no, trimmed) {
                Ok(Some(snapshot)) => return Some(Ok(snapshot)),
                Ok(None) => {
                    self.skipped += 1;
                    debug!(line = self.line_no, "Replay record skipped: empty book side");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn parse_line(line: usize, text: &str) -> Result<Option<BookSnapshot>> {
    let record: SnapshotRecord = serde_json::from_str(text).map_err(|e| Error::Replay {
        line,
        reason: e.to_string(),
    })?;
    if record.bids.is_empty() || record.asks.is_empty() {
        return Ok(None);
    }
    BookSnapshot::try_from(record)
        .map(Some)
        .map_err(|e| Error::Replay {
            line,
            reason: e.to_string(),
        })
}

/// Replays a log as a [`SnapshotSource`], optionally paced to recorded time.
///
/// With `speedup > 0` each snapshot is delayed by the gap to the previous one
/// divided by `speedup`; `speedup == 0` yields snapshots as fast as they parse.
pub struct PacedReplay<R> {
    reader: ReplayReader<R>,
    speedup: f64,
    last_ts: Option<f64>,
}

impl<R: BufRead> PacedReplay<R> {
    pub fn new(reader: ReplayReader<R>, speedup: f64) -> Self {
        Self {
            reader,
            speedup,
            last_ts: None,
        }
    }

    pub fn skipped(&self) -> usize {
        self.reader.skipped()
    }
}

#[async_trait]
impl<R: BufRead + Send> SnapshotSource for PacedReplay<R> {
    async fn next_snapshot(&mut self) -> Result<Option<BookSnapshot>> {
        let Some(snapshot) = self.reader.next().transpose()? else {
            return Ok(None);
        };

        if self.speedup > 0.0 {
            if let Some(last) = self.last_ts {
                let gap = snapshot.ts() - last;
                if gap > 0.0 {
                    let delay = Duration::try_from_secs_f64(gap / self.speedup).map_err(|_| {
                        Error::Config(format!(
                            "replay delay out of range: gap {gap}s at speedup {}",
                            self.speedup
                        ))
                    })?;
                    tokio::time::sleep(delay).await;
                }
            }
        }
        self.last_ts = Some(snapshot.ts());
        Ok(Some(snapshot))
    }
}
