mod books;
mod config;
mod error;
mod games;
mod numeric;
mod persistence;
mod service;

use anyhow::Context;
use books::BookService;
use clap::Parser;
use config::Config;
use games::GameService;
use persistence::PersistenceHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config);

    tracing::info!("Starting Ludothèque server");

    let location = config.database_location();
    tracing::info!("Using database: {:?}", location);

    let persistence = Arc::new(PersistenceHandle::new(location, config.connect_options()));
    persistence
        .connect()
        .await
        .context("failed to connect to the document database")?;

    let books = Arc::new(BookService::new(persistence.clone()));
    let games = Arc::new(GameService::new(persistence.clone()));
    let app = service::router(books, games);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down");
    persistence.disconnect().await;
    Ok(())
}

/// Console logging with span durations, plus a daily-rotated file when
/// `--log-dir` is set.
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ludotheque.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
