//! Order book pressure CLI.
//!
//! Commands:
//! - `run`: replay a recorded depth log (or follow the live stream) through
//!   features, signal detection and the horizon backtest
//! - `capture`: record the live depth stream to a JSONL log for replay

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, Mode, SnapshotSource, Summary};
use engine::{capture, depth_stream_url, BinanceDepthStream, PacedReplay, Pipeline, ReplayReader, ReportWriter};

#[derive(Parser)]
#[command(name = "obp", about = "Order book pressure signals and horizon backtest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline in the configured mode and write a per-tick report.
    Run {
        /// Path to a TOML config file.
        #[arg(long, default_value = "config/default.toml")]
        config: PathBuf,

        /// Per-tick CSV report.
        #[arg(long, default_value = "data/tmp/replay_results.csv")]
        out: PathBuf,

        /// Also write the final summary as JSON.
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Record the live depth stream to a JSONL log.
    Capture {
        /// Symbol, e.g. btcusdt.
        #[arg(long, default_value = "btcusdt")]
        symbol: String,

        /// Stream time to record, in minutes.
        #[arg(long, default_value_t = 5)]
        minutes: u64,

        /// Output file. Defaults to data/raw/<symbol>_<timestamp>.jsonl.
        #[arg(long)]
        outfile: Option<PathBuf>,

        /// Book levels kept per side.
        #[arg(long, default_value_t = 20)]
        levels: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            out,
            summary_out,
        } => run(&config, &out, summary_out.as_deref()).await,
        Commands::Capture {
            symbol,
            minutes,
            outfile,
            levels,
        } => run_capture(&symbol, minutes, outfile, levels).await,
    }
}

async fn run(config_path: &Path, out: &Path, summary_out: Option<&Path>) -> Result<()> {
    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(mode = %cfg.mode, symbol = %cfg.symbol, levels = cfg.levels, "obp starting");

    // ── Source ────────────────────────────────────────────────────────────────
    let mut source: Box<dyn SnapshotSource> = match cfg.mode {
        Mode::Replay => {
            let reader = ReplayReader::open(&cfg.replay.file)
                .with_context(|| format!("failed to open replay file {}", cfg.replay.file))?;
            info!(file = %cfg.replay.file, speedup = cfg.replay.speedup, "Replay mode");
            Box::new(PacedReplay::new(reader, cfg.replay.speedup))
        }
        Mode::Live => {
            info!(url = %cfg.ws_url, "Live mode, Ctrl-C to stop");
            let (feed, _handle) = BinanceDepthStream::spawn(&cfg.ws_url, cfg.levels);
            Box::new(feed)
        }
    };

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let mut report = ReportWriter::create(out)
        .with_context(|| format!("failed to create report at {}", out.display()))?;
    let mut pipeline = Pipeline::from_config(&cfg)?;

    tokio::select! {
        result = pipeline.run(source.as_mut(), &mut report) => {
            result.context("pipeline run failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Finishing report.");
        }
    }
    report.flush()?;

    let summary = pipeline.summary();
    print_summary(&summary)?;
    if let Some(path) = summary_out {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    info!(rows = report.rows(), out = %out.display(), "Report written");
    Ok(())
}

async fn run_capture(symbol: &str, minutes: u64, outfile: Option<PathBuf>, levels: usize) -> Result<()> {
    let outfile = outfile.unwrap_or_else(|| {
        PathBuf::from("data/raw").join(format!(
            "{}_{}.jsonl",
            symbol.to_lowercase(),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });
    if let Some(parent) = outfile.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let url = depth_stream_url(symbol);
    info!(url = %url, minutes, outfile = %outfile.display(), "Capturing depth stream");
    let (mut feed, handle) = BinanceDepthStream::spawn(url, levels);

    let mut writer = BufWriter::new(
        File::create(&outfile).with_context(|| format!("failed to create {}", outfile.display()))?,
    );
    let lines = capture(&mut feed, &mut writer, (minutes * 60) as f64).await?;
    handle.abort();

    info!(lines, outfile = %outfile.display(), "Wrote capture");
    Ok(())
}

fn print_summary(summary: &Summary) -> Result<()> {
    println!("Summary: {}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
