//! Presenter Daemon Binary
//!
//! Serves the presenter state over WebSocket and a read-only HTTP API.
//!
//! # Usage
//!
//! ```bash
//! presenter-daemon
//! presenter-daemon --port 1699 --http-port 1700 --data-dir ./data
//! presenter-daemon --ipc            # when launched by the desktop shell
//! ```

use std::fs::OpenOptions;
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use presenter_engine::api::{self, ApiState};
use presenter_engine::app::{Presenter, PresenterOptions};
use presenter_engine::cli::Args;
use presenter_engine::corpus::{SharedCorpus, SqliteCorpus};
use presenter_engine::events::{read_updater_events, EventEmitter, ServerReadyEvent};
use presenter_engine::history::{History, HistorySink};
use presenter_engine::paths::AppPaths;
use presenter_engine::settings::GlobalSettingsStore;
use presenter_engine::socket_server::{
    heartbeat_middleware, resolve_host_middleware, serve, SocketHandler, SocketServer, HEARTBEAT_INTERVAL,
    LOOKUP_TIMEOUT,
};
use presenter_engine::{themes, PresenterError};

const DEFAULT_LOG_DIRECTIVES: &str = "presenter_engine=info,presenter_daemon=info";

/// Console logs go to stderr when stdout carries supervisor events.
fn init_logging(paths: &AppPaths, ipc: bool) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    let log_file = OpenOptions::new().create(true).append(true).open(&paths.log_file)?;
    let file_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(log_file));

    let console_layer = if ipc {
        fmt::layer().with_writer(io::stderr).boxed()
    } else {
        fmt::layer().boxed()
    };

    // Already initialized is fine
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| match e.kind() {
        io::ErrorKind::AddrInUse => PresenterError::AddressInUse { addr: addr.to_string() }.into(),
        _ => anyhow::Error::new(e).context(format!("failed to bind {}", addr)),
    })
}

async fn run(args: Args, paths: AppPaths, events: EventEmitter) -> anyhow::Result<()> {
    tracing::info!("Starting presenter-daemon v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data folder: {}", paths.data_dir.display());

    let database = args.database();
    let corpus: SharedCorpus = Arc::new(
        SqliteCorpus::open(&database).with_context(|| format!("failed to open corpus {}", database.display()))?,
    );

    let global = Arc::new(GlobalSettingsStore::new(&paths.settings_file));
    global.load();

    let history = History::new(Some(HistorySink::spawn(&paths.history_file)?));
    themes::copy_example_themes(&paths);

    let socket_listener = bind(args.socket_addr()).await?;
    let http_listener = bind(args.http_addr()).await?;

    let server = Arc::new(SocketServer::new());
    server.on_connection(resolve_host_middleware(LOOKUP_TIMEOUT));
    server.on_connection(heartbeat_middleware());

    let presenter = Presenter::start(
        Arc::clone(&server),
        PresenterOptions {
            corpus: Arc::clone(&corpus),
            global,
            history,
            paths: paths.clone(),
            events,
        },
    )
    .await?;
    let _heartbeat = server.spawn_heartbeat(HEARTBEAT_INTERVAL);

    if events.is_enabled() {
        let presenter = Arc::clone(&presenter);
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = read_updater_events(stdin, |event| presenter.updater_event(event)).await {
                tracing::warn!("Stopped reading supervisor events: {}", e);
            }
        });
    }

    let router = api::router(Arc::new(ApiState::new(corpus, paths)));
    tracing::info!("HTTP API listening on http://{}", http_listener.local_addr()?);

    events.emit(&ServerReadyEvent {});

    let handler: Arc<dyn SocketHandler> = presenter;
    tokio::select! {
        result = serve(socket_listener, server, handler) => result,
        result = axum::serve(http_listener, router).into_future() => result.context("HTTP server failed"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let paths = args.paths(Utc::now());
    let events = EventEmitter::new(args.ipc);

    if let Err(e) = paths.ensure_app_folders() {
        eprintln!("Error: {}", e);
        return e.exit_code();
    }
    if let Err(e) = init_logging(&paths, args.ipc) {
        eprintln!("Unable to open log file {}: {}", paths.log_file.display(), e);
    }

    match run(args, paths, events).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<PresenterError>() {
            Some(PresenterError::AddressInUse { addr }) => {
                tracing::info!("{} is already in use, another instance is serving", addr);
                events.emit(&ServerReadyEvent {});
                ExitCode::SUCCESS
            }
            Some(err) => {
                tracing::error!("{:#}", e);
                err.exit_code()
            }
            None => {
                tracing::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}
