pub mod api;
pub mod app;
pub mod common;
pub mod config;
pub mod credentials;
pub mod devices;
pub mod event;
pub mod pages;
pub mod poller;
pub mod session;
pub mod tui;
pub mod ui;

use anyhow::{Context, Result};
use api::atera::AteraClient;
use app::App;
use config::Config;
use event::EventHandler;
use secrecy::SecretString;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File-only logging; anything on stdout would corrupt the terminal UI.
fn setup_tracing(config: &Config) -> WorkerGuard {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("atera_tui=info"));

    let log_dir = config
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("."));
    let log_filename = config
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("atera-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e:#}");
        std::process::exit(1);
    });

    let _guard = setup_tracing(&config);
    info!(api_url = %config.atera.api_url, "starting");

    let mut client =
        AteraClient::new(config.atera.clone()).context("Failed to create API client")?;
    if let Some(key) = config.api_key.clone() {
        info!("using API key from ATERA_API_KEY");
        client.set_api_key(SecretString::from(key));
    }
    let credentials = credentials::open_default_store();

    let mut terminal = tui::init()?;
    tui::install_panic_hook();

    let mut app = App::new(client, credentials, config.poll_interval);

    let tick_rate = Duration::from_millis(250);
    let mut events = EventHandler::new(tick_rate);

    let res = app.run(&mut terminal, &mut events).await;

    tui::restore()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    info!("exiting");
    Ok(())
}
