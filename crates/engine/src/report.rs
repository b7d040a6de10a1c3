use std::fs::File;
use std::io::Write;
use std::path::Path;

use common::{Error, Result};

use crate::pipeline::Tick;

const HEADER: [&str; 9] = [
    "ts",
    "mid",
    "imbalance",
    "bid_slope",
    "ask_slope",
    "update_rate",
    "signal",
    "strength",
    "cum_pnl_ticks",
];

/// Per-tick CSV report. Undefined mids and absent signals are empty cells.
pub struct ReportWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: usize,
}

impl ReportWriter<File> {
    /// Create the report file, including missing parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(File::create(path)?)
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        let mut inner = csv::Writer::from_writer(writer);
        inner.write_record(HEADER)?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write_tick(&mut self, tick: &Tick) -> Result<()> {
        let fv = &tick.features;
        let (signal, strength) = match &tick.signal {
            Some(sig) => (sig.kind.to_string(), sig.strength.to_string()),
            None => (String::new(), String::new()),
        };
        self.inner.write_record([
            tick.ts.to_string(),
            tick.mid.map(|m| m.to_string()).unwrap_or_default(),
            fv.imbalance.to_string(),
            fv.bid_slope.to_string(),
            fv.ask_slope.to_string(),
            fv.update_rate.to_string(),
            signal,
            strength,
            tick.cum_pnl_ticks.to_string(),
        ])?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}
