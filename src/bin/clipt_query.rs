use anyhow::Result;
use clap::Parser;
use clipt_sync::search::run_query;
use clipt_sync::{Config, FileStore, HttpQueryClient, QueryOutcome, QueryRequest};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "clipt-query")]
#[command(about = "Search a channel and store the results for navigation")]
struct Cli {
    /// Phrase to search for
    query_phrase: String,

    /// Channel the videos belong to
    #[arg(long)]
    channel_url: String,

    /// Key to store the results under (defaults to the phrase)
    #[arg(short, long)]
    query_key: Option<String>,

    #[arg(long)]
    customer_key: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session store directory (defaults to the configured one)
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("clipt_sync=info,warn")
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let store_dir = cli.store_dir.clone().unwrap_or_else(|| config.storage.store_dir.clone());
    let store = FileStore::open(&store_dir)?;
    let client = HttpQueryClient::new(config.services.query_url(), config.services.request_timeout())?;

    let query_key = cli.query_key.clone().unwrap_or_else(|| cli.query_phrase.clone());
    let request = QueryRequest {
        query_phrase: cli.query_phrase.clone(),
        channel_url: cli.channel_url.clone(),
        customer_key: cli.customer_key.clone(),
    };

    match run_query(&client, &store, &query_key, &request, &config).await {
        QueryOutcome::Results(groups) => {
            info!("💾 Results stored under '{}' in {}", query_key, store_dir.display());
            for group in groups {
                println!("{} ({} matches)", group.video_id, group.matches.len());
                for entry in group.matches {
                    println!("  {:.3}  {}", entry.score, entry.text);
                    println!("         {}", entry.landing_url);
                }
            }
        }
        QueryOutcome::Failed(message) => {
            println!("{}", message);
        }
        QueryOutcome::AuthRequired { login_url } => {
            println!("Authentication required, log in at {}", login_url);
        }
    }

    Ok(())
}
