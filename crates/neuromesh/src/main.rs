//! NeuroMesh terminal client for the NeuroMesh LLM mesh.
//!
//! # Usage
//!
//! ```bash
//! neuromesh                          # Interactive TUI on the chat page
//! neuromesh --page peers             # Start on the peer dashboard
//! neuromesh --base-url http://gpu:8080/app
//! neuromesh ask "Explain machine learning"
//! neuromesh peers --json
//! ```
//!
//! Configuration is read from `~/.config/neuromesh/config.toml` when it
//! exists; command-line flags override it for this run.
//!
//! # Architecture
//!
//! - `api_client`: HTTP implementation of the backend API
//! - `app`: TUI state and update logic (Elm Architecture)
//! - `event`: terminal events to actions
//! - `poller`: background refresh of the peer dashboard
//! - `runner`: terminal setup and the main async loop
//! - `ui`: rendering

mod api_client;
mod app;
mod event;
mod poller;
mod runner;
mod ui;

use anyhow::{bail, Context, Result};
use api_client::ApiClient;
use clap::{Parser, Subcommand, ValueEnum};
use neuromesh_core::api::MeshApi;
use neuromesh_core::config::AppConfig;
use neuromesh_core::conversation::{ChatOutcome, ConversationStore};
use neuromesh_core::session::Page;
use std::path::PathBuf;
use tracing::{debug, info};

/// NeuroMesh: chat with the mesh LLM and watch peer conversations.
#[derive(Parser, Debug)]
#[command(name = "neuromesh", version, about = "NeuroMesh terminal client")]
struct Cli {
    /// One-shot command. If omitted, starts the interactive TUI.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8080/app.
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds between peer dashboard refreshes (5-10).
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Page shown when the TUI starts.
    #[arg(long, value_enum, default_value_t = StartPage::Chat)]
    page: StartPage,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and print the reply.
    Ask {
        /// The message to send.
        message: String,
    },
    /// Print the current peer conversations.
    Peers {
        /// Print the raw snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StartPage {
    Chat,
    Peers,
}

impl From<StartPage> for Page {
    fn from(page: StartPage) -> Self {
        match page {
            StartPage::Chat => Page::Chat,
            StartPage::Peers => Page::Peers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so it can only log to a file.
    init_logging(cli.command.is_none());

    let config = load_config(&cli)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        None => runner::run(&config, cli.page.into()).await,
        Some(Command::Ask { message }) => ask(&config, &message).await,
        Some(Command::Peers { json }) => peers(&config, json).await,
    }
}

/// Reads the config file and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
            .with_context(|| format!("config file {} does not exist", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// `neuromesh ask`: one exchange through the same store the TUI uses.
async fn ask(config: &AppConfig, message: &str) -> Result<()> {
    let client = ApiClient::new(config)?;
    let mut conversation = ConversationStore::new();

    let Some(outcome) = conversation.send(&client, message).await else {
        bail!("nothing to send: the message is empty");
    };
    let reply = conversation
        .messages()
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    match outcome {
        ChatOutcome::Appended => {
            println!("{reply}");
            Ok(())
        }
        _ => bail!("{reply} (backend at {} unreachable)", client.chat_url()),
    }
}

/// `neuromesh peers`: a single poll, printed as text or JSON.
async fn peers(config: &AppConfig, json: bool) -> Result<()> {
    let client = ApiClient::new(config)?;
    let snapshot = client
        .peer_conversations()
        .await
        .with_context(|| format!("failed to load peer conversations from {}", client.peers_url()))?;
    info!(peers = snapshot.len(), "peer snapshot loaded");

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("No peer conversations are currently available.");
        return Ok(());
    }
    for (ip, peer) in &snapshot {
        let role = if peer.host_info.is_llm_host {
            " [LLM host]"
        } else {
            ""
        };
        println!("{ip}  {}{role}", peer.host_info.hostname);
        for msg in &peer.messages {
            println!(
                "  [{}] {:?}: {}",
                msg.time_label(),
                msg.message_type,
                msg.content
            );
        }
    }
    Ok(())
}

/// Sets up `tracing`, filtered by the `NEUROMESH_LOG` environment variable.
///
/// Interactive sessions log to `neuromesh.log` in the data directory.
/// One-shot commands log to stderr.
fn init_logging(to_file: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if to_file { "info" } else { "warn" };
    let env_filter = EnvFilter::try_from_env("NEUROMESH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if !to_file {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return;
    }

    // If the log file can't be opened, the TUI runs without logging.
    let file_layer = AppConfig::data_dir()
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("neuromesh.log"))
                .ok()
        })
        .map(|file| {
            fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("neuromesh").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_subcommand_starts_tui_on_chat() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(Page::from(cli.page), Page::Chat);
    }

    #[test]
    fn parses_overrides_and_subcommands() {
        let cli = parse(&["--page", "peers", "--poll-interval", "7", "peers", "--json"]);
        assert_eq!(Page::from(cli.page), Page::Peers);
        assert_eq!(cli.poll_interval, Some(7));
        assert!(matches!(cli.command, Some(Command::Peers { json: true })));

        let cli = parse(&["ask", "What is neural mesh AI?"]);
        assert!(
            matches!(cli.command, Some(Command::Ask { ref message }) if message == "What is neural mesh AI?")
        );
    }

    #[test]
    fn overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://mesh:9000/app\"\n").unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--poll-interval",
            "10",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.base_url, "http://mesh:9000/app");
        assert_eq!(config.poll_interval_secs, 10);
    }

    #[test]
    fn missing_named_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let cli = parse(&["--config", path.to_str().unwrap()]);
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("does not exist"));
    }

    #[test]
    fn out_of_range_poll_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        let cli = parse(&["--config", path.to_str().unwrap(), "--poll-interval", "2"]);
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("poll_interval_secs"));
    }

    #[test]
    fn flag_overrides_out_of_range_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_secs = 20\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap()]);
        assert!(load_config(&cli).is_err());

        let cli = parse(&["--config", path.to_str().unwrap(), "--poll-interval", "7"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.poll_interval_secs, 7);
    }

    #[test]
    fn flag_overrides_invalid_file_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"mesh:8080\"\n").unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "http://mesh:8080/app",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.base_url, "http://mesh:8080/app");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "http://gpu:8080/app/",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.chat_url(), "http://gpu:8080/app/chat");
    }
}
