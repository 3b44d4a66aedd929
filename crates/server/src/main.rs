use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use gantry_server::api::{self, AppState};
use gantry_server::cli;
use gantry_server::config::GantryConfig;
use gantry_server::logging;
use gantry_server::orchestrator_factory::{create_orchestrator, create_store};

#[derive(Parser, Debug)]
#[command(name = "gantry-server", about = "Release pipeline of the Gantry API gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gantry.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default).
    Serve,
    /// Publish a resource version and wait for distribution to finish.
    Sync {
        #[command(flatten)]
        target: TargetArgs,
        /// Comment recorded on the release history.
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Print the registry content a publish would produce, without writing it.
    Render {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Gateway name.
    #[arg(long)]
    gateway: String,
    /// Stage name.
    #[arg(long)]
    stage: String,
    /// Resource version label, e.g. `1.4.0`.
    #[arg(long)]
    version: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let config = GantryConfig::load(&args.config)?;
    logging::init(&config.logging);

    let store = create_store(&config.catalog)?;
    let orchestrator = create_orchestrator(&config, store.clone()).await?;

    match args.command {
        Some(Commands::Sync { target, comment }) => {
            let target =
                cli::resolve(store.as_ref(), &target.gateway, &target.stage, &target.version)
                    .await?;
            let result = cli::sync(&orchestrator, target, &comment).await;
            orchestrator.shutdown().await;
            match result {
                Ok(id) => {
                    info!(release_history_id = %id, "sync finished");
                    println!("{id}");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "sync failed");
                    Err(e.into())
                }
            }
        }
        Some(Commands::Render { target }) => {
            let target =
                cli::resolve(store.as_ref(), &target.gateway, &target.stage, &target.version)
                    .await?;
            let rendered = cli::render(&orchestrator, target).await?;
            for (key, payload) in rendered {
                println!("{key}\n{payload}\n");
            }
            Ok(())
        }
        Some(Commands::Serve) | None => {
            let host = args.host.unwrap_or_else(|| config.server.host.clone());
            let port = args.port.unwrap_or(config.server.port);
            let app = api::router(AppState {
                orchestrator: orchestrator.clone(),
            });

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(address = %addr, "gantry-server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            let timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
            info!(timeout_secs = timeout.as_secs(), "waiting for publish tasks");
            if tokio::time::timeout(timeout, orchestrator.shutdown())
                .await
                .is_err()
            {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "shutdown timeout exceeded, unfinished publishes stay doing"
                );
            }
            info!("gantry-server shut down");
            Ok(())
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
