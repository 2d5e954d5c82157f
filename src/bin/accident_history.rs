//! accident_history - list recent analysis records

use anyhow::Result;
use clap::Parser;

use accident_kernel::{AppConfig, HistoryStore, SqliteHistoryStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// History database path (overrides configuration).
    #[arg(long)]
    db_path: Option<String>,
    /// Maximum number of records, newest first.
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Print records as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let db_path = match args.db_path {
        Some(path) => path,
        None => AppConfig::load()?.db_path,
    };
    let mut store = SqliteHistoryStore::open(&db_path)?;
    let records = store.recent(args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("no history in {}", db_path);
        return Ok(());
    }
    for rec in records {
        println!(
            "#{:<4} {}  {:<22} {:>6.2}%  {:>6.2}s  {}",
            rec.id, rec.date_time, rec.result, rec.confidence, rec.processing_time, rec.location
        );
    }
    Ok(())
}
