use anyhow::Result;
use clap::Parser;
use clipt_sync::{Config, FileStore, NavigationSequence, PersistedStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "nav-inspect")]
#[command(about = "Show the navigation sequence a video detail view would build")]
struct Cli {
    /// Video identifier
    video_id: String,

    /// Key the search results were stored under
    #[arg(short, long)]
    query_key: String,

    /// Requested offset in seconds
    #[arg(short = 't', long)]
    offset: Option<f64>,

    /// Session store directory (defaults to the configured one)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Offset tolerance in seconds (defaults to the configured one)
    #[arg(long)]
    tolerance: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("clipt_sync=info,info")
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    let store_dir = cli.store_dir.unwrap_or(config.storage.store_dir);
    let tolerance = cli.tolerance.unwrap_or(config.navigation.offset_tolerance_seconds);
    let store = FileStore::open(&store_dir)?;

    if store.get(&cli.query_key).is_none() {
        info!("📭 Nothing stored under '{}' in {}", cli.query_key, store_dir.display());
    }

    let sequence = NavigationSequence::build(&store, Some(&cli.query_key), &cli.video_id, cli.offset, tolerance);

    if sequence.is_empty() {
        println!("No navigation context for {}", cli.video_id);
        return Ok(());
    }

    let cursor = sequence.cursor().index();
    for (i, entry) in sequence.entries().iter().enumerate() {
        let marker = if Some(i) == cursor { "▶" } else { " " };
        println!(
            "{} {:>3}  {:>8}  {:.3}  {}",
            marker,
            i + 1,
            clipt_sync::transcript::format_clock(entry.offset_seconds),
            entry.score,
            entry.text
        );
    }
    if let Some(label) = sequence.position_label() {
        println!("Cursor: {}", label);
    }

    Ok(())
}
