//! Solace API server binary.
//!
//! Loads configuration from the environment (and `.env`), runs migrations,
//! starts the expired-token sweeper, and serves the REST API until Ctrl-C.

use std::time::Duration;

use clap::Parser;
use solace_api::AppState;
use solace_api::config::ApiConfig;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments. Anything not given here comes from the environment.
#[derive(Parser, Debug)]
#[command(name = "solace_api_server", about = "Solace API server")]
struct Args {
    /// Address to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL; overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Skip running embedded migrations at startup.
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,solace_api=debug,solace_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    info!(config = ?config, "starting solace_api_server");

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    if args.skip_migrations {
        warn!("skipping database migrations");
    } else {
        info!("running database migrations");
        solace_api::migrate(&pool).await?;
    }

    let bind_addr = config.bind_addr.clone();
    let sweep_every = Duration::from_secs(config.sweep_interval_secs);
    let state = AppState::from_config(pool, config)?;
    let sweeper = state.sessions.spawn_sweeper(sweep_every);

    let app = solace_api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    sweeper.abort();
    info!("server stopped");
    result?;
    Ok(())
}
