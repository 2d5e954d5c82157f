//! accident_live - per-frame accident labels for visual inspection
//!
//! Scores every decoded frame and reports its label immediately, either as a
//! log line or as an annotated PNG snapshot. Ctrl-C stops after the current frame.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use accident_kernel::{
    open_classifier, run_live, AppConfig, FileConfig, FileSource, LiveOptions, LogSink,
    OverlaySink, SnapshotSink,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file or stub:// clip to label.
    #[arg(long)]
    video: String,
    /// Write annotated PNG frames to this directory instead of logging.
    #[arg(long)]
    snapshots: Option<String>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AppConfig::load()?;
    let classifier = open_classifier(&cfg.classifier, cfg.geometry)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut sink: Box<dyn OverlaySink> = match &args.snapshots {
        Some(dir) => {
            log::info!("writing annotated frames to {}", dir);
            Box::new(SnapshotSink::new(dir)?)
        }
        None => Box::new(LogSink),
    };

    let options = LiveOptions {
        geometry: cfg.geometry,
        max_frames: args.max_frames,
    };
    let source = FileSource::open(FileConfig::new(args.video.as_str()))?;
    log::info!("live overlay running on {} (Ctrl-C to stop)", args.video);
    let summary = run_live(
        source,
        classifier.as_ref(),
        &options,
        cancel.as_ref(),
        sink.as_mut(),
    )?;

    println!(
        "frames labeled: {}\naccident frames: {}\nstopped early: {}",
        summary.frames_rendered, summary.accident_frames, summary.cancelled
    );
    Ok(())
}
