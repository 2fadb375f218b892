use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use clipt_sync::{
    Config, DeepLink, FileStore, HttpAssistantClient, HttpSummarySource, HttpTranscriptSource, PlayerControl,
    ScrollRequest, SessionDriver, TranscriptScroller, VideoSession, ViewEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Player stand-in that logs the commands it receives
struct ConsolePlayer;

impl PlayerControl for ConsolePlayer {
    fn load(&mut self, source: &str) {
        info!("📺 player.load({})", source);
    }

    fn seek(&mut self, offset_seconds: f64) {
        info!("📺 player.seek({:.2})", offset_seconds);
    }
}

struct ConsoleScroller;

impl TranscriptScroller for ConsoleScroller {
    fn scroll_to_line(&mut self, request: ScrollRequest) {
        info!("📜 transcript.scroll_to_line({})", request.line);
    }
}

/// One line typed on stdin
#[derive(Debug, PartialEq)]
enum ConsoleCommand {
    Event(ViewEvent),
    Show,
    Quit,
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let index = || rest.parse::<usize>().ok();

    let event = match word {
        "pos" => ViewEvent::Position(rest.parse().ok()?),
        "play" => ViewEvent::Play,
        "next" => ViewEvent::NextTimestamp,
        "prev" => ViewEvent::PrevTimestamp,
        "select" => ViewEvent::SelectTimestamp(index()?),
        "line" => ViewEvent::TranscriptLineClicked(index()?),
        "ask" => ViewEvent::Ask(rest.to_string()),
        "jump" => ViewEvent::JumpToAnswer(index()?),
        "show" => return Some(ConsoleCommand::Show),
        "quit" | "exit" => return Some(ConsoleCommand::Quit),
        _ => return None,
    };
    Some(ConsoleCommand::Event(event))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Clipt Sync")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Video detail session: transcript sync, search-moment navigation and assistant chat")
        .arg(
            Arg::new("link")
                .value_name("URL")
                .help("Deep link such as https://host/VIDEO?t=90&q=KEY")
        )
        .arg(
            Arg::new("video-id")
                .long("video-id")
                .value_name("ID")
                .help("Video identifier (instead of a link)")
        )
        .arg(
            Arg::new("query-key")
                .short('q')
                .long("query-key")
                .value_name("KEY")
                .help("Key of the stored search results")
        )
        .arg(
            Arg::new("offset")
                .short('t')
                .long("offset")
                .value_name("SECONDS")
                .help("Requested offset in seconds")
                .value_parser(clap::value_parser!(f64))
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
        )
        .arg(
            Arg::new("store-dir")
                .long("store-dir")
                .value_name("DIR")
                .help("Session store directory")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    let default_filter = if matches.get_flag("verbose") {
        "clipt_sync=debug,info".to_string()
    } else {
        format!("clipt_sync={},warn", config.logging.log_level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    if let Some(dir) = matches.get_one::<String>("store-dir") {
        config.storage.store_dir = PathBuf::from(dir);
    }
    config.validate()?;

    let link = match (matches.get_one::<String>("link"), matches.get_one::<String>("video-id")) {
        (Some(address), _) => DeepLink::parse(address).context("Invalid deep link")?,
        (None, Some(video_id)) => DeepLink::new(video_id.as_str()),
        (None, None) => anyhow::bail!("Either a link or --video-id is required"),
    };
    let link = match matches.get_one::<String>("query-key") {
        Some(key) => link.with_query_key(Some(key.clone())),
        None => link,
    };
    let link = match matches.get_one::<f64>("offset") {
        Some(offset) => link.with_offset(Some(*offset)),
        None => link,
    };

    info!("🚀 Clipt Sync starting...");
    info!("{}", config.summary());
    info!("🔗 Opening {}", link.to_url(&config.services.backend_url));

    let store = FileStore::open(&config.storage.store_dir)?;
    let timeout = config.services.request_timeout();
    let assistant = Arc::new(HttpAssistantClient::new(config.services.chat_url(), timeout)?);
    let transcripts = Arc::new(HttpTranscriptSource::new(config.services.transcript_base_url.clone(), timeout)?);
    let summaries = Arc::new(HttpSummarySource::new(config.services.summary_url(), timeout)?);

    let session = VideoSession::open(
        link,
        &store,
        ConsolePlayer,
        ConsoleScroller,
        &config,
        tokio::time::Instant::now(),
    );
    let mut driver = SessionDriver::new(session, assistant, transcripts, summaries);
    let snapshots = driver.subscribe();

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(read_console(tx, snapshots));

    let session = driver.run(rx).await;
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

    Ok(())
}

async fn read_console(tx: mpsc::Sender<ViewEvent>, snapshots: watch::Receiver<clipt_sync::ViewModel>) {
    println!("Commands: pos <secs>, play, next, prev, select <n>, line <n>, ask <question>, jump <n>, show, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(ConsoleCommand::Event(event)) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Some(ConsoleCommand::Show) => {
                let view = snapshots.borrow().clone();
                match serde_json::to_string_pretty(&view) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to render view: {}", e),
                }
            }
            Some(ConsoleCommand::Quit) => break,
            None => warn!("Unknown command: {}", line.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("pos 12.5"), Some(ConsoleCommand::Event(ViewEvent::Position(12.5))));
        assert_eq!(
            parse_command("ask  where is the   sauce? "),
            Some(ConsoleCommand::Event(ViewEvent::Ask("where is the   sauce?".to_string())))
        );
        assert_eq!(parse_command("select 2"), Some(ConsoleCommand::Event(ViewEvent::SelectTimestamp(2))));
        assert_eq!(parse_command("show"), Some(ConsoleCommand::Show));
        assert_eq!(parse_command("line x"), None);
        assert_eq!(parse_command("dance"), None);
    }
}
