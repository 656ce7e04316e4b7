// src/main.rs - task-app API entry point
use std::sync::Arc;

use clap::Parser;
use task_app::auth::revocation::spawn_purge_task;
use task_app::auth::{InMemoryCredentials, RevocationStore, TokenCodec};
use task_app::config;
use task_app::web::{AppStateInner, create_router};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Parser, Debug)]
#[command(name = "task-app", version, about = "Task list API server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "task-app.toml")]
    config: String,

    /// Override the listen address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    tracing::info!("Starting task-app API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", args.config);

    let mut config = config::load_config(&args.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", args.config, e);
        Box::new(e) as BoxError
    })?;
    config::apply_env(&mut config);
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let revocations = RevocationStore::new();
    let codec = TokenCodec::from_config(&config.auth, revocations.clone()).map_err(|e| {
        tracing::error!("Invalid auth configuration: {}", e);
        Box::new(e) as BoxError
    })?;
    tracing::info!("Session tokens valid for {}s", codec.ttl().as_secs());

    let credentials = InMemoryCredentials::new(config.auth.users.clone());
    if credentials.is_empty() {
        tracing::warn!("No users configured; every login will fail");
    } else {
        tracing::info!("Loaded {} user account(s)", credentials.len());
    }

    let purge_task = spawn_purge_task(
        revocations,
        codec.clock(),
        config.auth.revocation_purge_interval(),
    );

    let state = Arc::new(AppStateInner {
        codec,
        credentials: Box::new(credentials),
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
