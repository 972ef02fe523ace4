//! Main Entrypoint for the Headless Avatar Teacher Player
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Initializing logging (to stderr; stdout is the player's screen).
//! 3. Wiring the HTTP topic client, terminal view and simulated media into a
//!    `PlaybackController`.
//! 4. Running the input loop until the user quits or sends Ctrl+C.

use anyhow::Context;
use avatar_teacher_core::{HttpTopicApi, PlaybackController, TopicView};
use avatar_teacher_player::{
    app::{Flow, apply_media_event, dispatch},
    commands::{Command, HELP},
    config::{Config, validate_base_url},
    media::SimulatedMedia,
    terminal::TerminalView,
};
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless avatar teacher player")]
struct Args {
    /// Root URL of the topic API; overrides API_BASE_URL.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Seconds each simulated narration track lasts; overrides SIMULATED_TRACK_SECS.
    #[arg(long)]
    track_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let args = Args::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(url) = args.api_base_url {
        validate_base_url("--api-base-url", &url)?;
        config.api_base_url = url;
    }
    if let Some(secs) = args.track_secs {
        config.track_duration = Duration::from_secs(secs);
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(api = %config.api_base_url, "Configuration loaded. Starting player...");

    // --- 3. Wire the Controller ---
    let api = HttpTopicApi::new(&config.api_base_url).context("Failed to create API client")?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let view: Arc<dyn TopicView> = Arc::new(TerminalView::new(std::io::stdout()));
    let video = Arc::new(SimulatedMedia::video());
    let audio = Arc::new(SimulatedMedia::audio(config.track_duration, event_tx));
    let controller = Arc::new(PlaybackController::new(
        Arc::new(api),
        view.clone(),
        video,
        audio,
        config.player_settings(),
    ));

    match controller.load_topics().await {
        Ok(()) => println!("{HELP}"),
        Err(e) => warn!(error = %e, "No topics to play; enter 'q' to quit"),
    }

    // --- 4. Input Loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal. Shutting down gracefully...");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => match dispatch(&controller, &view, command).await {
                        Flow::Quit => break,
                        Flow::Help => println!("{HELP}"),
                        Flow::Pending(_) | Flow::Continue => {}
                    },
                    Err(e) => warn!("{e}"),
                }
            }
            Some(event) = event_rx.recv() => {
                apply_media_event(&controller, event).await;
            }
        }
    }

    info!("Player has shut down.");
    Ok(())
}
