//! accident_analyze - batch accident analysis of one video clip
//!
//! 1. Loads configuration (ACCIDENT_CONFIG + env overrides)
//! 2. Opens the configured classifier once
//! 3. Samples and scores the clip, then prints the verdict
//! 4. Appends the verdict to the history database

use anyhow::{Context, Result};
use clap::Parser;

use accident_kernel::ingest::is_supported_container;
use accident_kernel::{
    analyze, open_classifier, AppConfig, FileConfig, FileSource, HistoryStore, NewHistoryRecord,
    PipelineError, Report, SqliteHistoryStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file to analyze (mp4, avi, mov, mkv) or a stub:// clip.
    #[arg(long)]
    video: String,
    /// Where the clip was recorded (stored with the history record).
    #[arg(long)]
    location: Option<String>,
    /// Score every Nth decoded frame (overrides configuration).
    #[arg(long)]
    cadence: Option<u32>,
    /// History database path (overrides configuration).
    #[arg(long)]
    db_path: Option<String>,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Do not append the verdict to the history database.
    #[arg(long)]
    no_history: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = AppConfig::load()?;
    if let Some(cadence) = args.cadence {
        cfg.cadence = cadence;
    }
    if let Some(db_path) = args.db_path {
        cfg.db_path = db_path;
    }
    let settings = cfg.pipeline_settings()?;

    if !args.video.starts_with("stub://") && !is_supported_container(&args.video) {
        return Err(PipelineError::config(format!(
            "unsupported video container '{}' (expected mp4, avi, mov or mkv)",
            args.video
        ))
        .into());
    }

    let classifier = open_classifier(&cfg.classifier, cfg.geometry)?;
    let source = FileSource::open(FileConfig::new(args.video.as_str()))?;
    let verdict = analyze(source, classifier.as_ref(), &settings)
        .with_context(|| format!("analyze {}", args.video))?;
    let report = Report::from_verdict(&verdict);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.to_text());
    }

    if !args.no_history {
        let mut store = SqliteHistoryStore::open(&cfg.db_path)?;
        let location = args.location.as_deref().or(Some(cfg.location.as_str()));
        let id = store.append(&NewHistoryRecord::from_report(&report, location))?;
        log::info!("history record #{} written to {}", id, cfg.db_path);
    }

    Ok(())
}
