mod common;
mod config;
mod feed;
mod identity;
mod presence;
mod sync;
mod ui;

use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use feed::{FeedBackend, FeedClient, FirestoreFeed, LocalFeed};
use identity::SessionContext;
use tokio::sync::{mpsc, watch};
use ui::{ChatApp, FeedLink};

use crate::config::{AppConfig, Backend, ConfigError};

const STARTUP_FAILED_NOTICE: &str = "Failed to start chat. Restart the app.";

#[derive(Parser)]
#[command(name = "anon_chat", version, about = "Anonymous realtime chat client")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Feed backend, overrides config and environment
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    /// Firestore project id
    #[arg(long, value_name = "PROJECT")]
    project: Option<String>,
    /// Collection holding the messages
    #[arg(long, value_name = "NAME")]
    collection: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let session = SessionContext::generate(&mut rand::thread_rng());
    log::info!(
        "Session started as {} ({})",
        session.id,
        session.display_name
    );

    let app_config = resolve_config(&cli);

    // The header counter runs even when the chat itself cannot start.
    let (count_tx, count_rx) = watch::channel(0);
    tokio::spawn(presence::run_online_counter(
        count_tx,
        online_count_interval(&app_config),
    ));

    let feed = match app_config {
        Ok(app_config) => start_feed(&app_config),
        Err(err) => {
            log::error!("Invalid configuration: {err}");
            None
        }
    };

    run_ui(session, feed, count_rx)
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut app_config = config::load_config(&cli.config);
    app_config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(backend) = cli.backend {
        app_config.backend = backend;
    }
    if let Some(project) = &cli.project {
        app_config.firestore.project_id = Some(project.clone());
    }
    if let Some(collection) = &cli.collection {
        app_config.collection = collection.clone();
    }

    app_config.validate()?;
    Ok(app_config)
}

/// Falls back to the default period when the config is unusable.
fn online_count_interval(app_config: &Result<AppConfig, ConfigError>) -> Duration {
    match app_config {
        Ok(app_config) => app_config.online_count_interval(),
        Err(_) => AppConfig::default().online_count_interval(),
    }
}

fn start_feed(app_config: &AppConfig) -> Option<FeedLink> {
    match app_config.backend {
        Backend::Local => {
            log::info!("Using in-process feed");
            Some(spawn_feed(LocalFeed::new(app_config.latency_compensation)))
        }
        Backend::Firestore => match app_config.firestore_settings() {
            Ok(settings) => {
                log::info!(
                    "Using Firestore project {} collection {}",
                    settings.project_id,
                    settings.collection
                );
                match FirestoreFeed::new(settings) {
                    Ok(feed) => Some(spawn_feed(feed)),
                    Err(err) => {
                        log::error!("Cannot build Firestore client: {err}");
                        None
                    }
                }
            }
            Err(err) => {
                log::error!("Cannot start Firestore feed: {err}");
                None
            }
        },
    }
}

fn spawn_feed<B: FeedBackend>(backend: B) -> FeedLink {
    // UI -> feed
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // feed -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let client = FeedClient::new(backend, event_tx, cmd_rx);
        if let Err(err) = client.run().await {
            log::error!("Feed client terminated: {err}");
        }
    });

    FeedLink {
        command_sender: cmd_tx,
        event_receiver: event_rx,
    }
}

fn run_ui(
    session: SessionContext,
    feed: Option<FeedLink>,
    online_count: watch::Receiver<u32>,
) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([420.0, 640.0]),
        ..Default::default()
    };
    let mut parts = Some((session, feed));

    eframe::run_native(
        "Anonymous Chat",
        options,
        Box::new(move |cc| {
            let (session, feed) = parts
                .take()
                .expect("ChatApp should only be initialized once");

            let app = match feed {
                Some(feed) => ChatApp::new(cc, session, feed, online_count.clone()),
                None => ChatApp::disconnected(
                    cc,
                    session,
                    STARTUP_FAILED_NOTICE,
                    online_count.clone(),
                ),
            };
            Ok(Box::new(app))
        }),
    )
}
