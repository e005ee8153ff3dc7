use anyhow::Context;
use clap::Parser;
use std::future::Future;
use std::time::Duration;
use tokio::signal;

use crate::config::{split_origins, AppConfig, Environment};
use crate::database::DatabaseManager;
use crate::routes::app;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "kpop-api")]
#[command(about = "JSON REST API for a K-pop catalog of groups, albums and songs")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "API server port")]
    pub port: Option<u16>,

    #[arg(long = "env", value_parser = parse_environment, help = "Environment (development|staging|production)")]
    pub environment: Option<Environment>,

    #[arg(long, help = "PostgreSQL DSN")]
    pub db_dsn: Option<String>,

    #[arg(long, help = "PostgreSQL max open connections")]
    pub db_max_open_conns: Option<u32>,

    #[arg(long, help = "PostgreSQL max connection idle time in seconds")]
    pub db_max_idle_time: Option<u64>,

    #[arg(long, help = "Per-query timeout in seconds")]
    pub db_query_timeout: Option<u64>,

    #[arg(long, help = "Trusted CORS origins (space separated)")]
    pub cors_trusted_origins: Option<String>,

    #[arg(long, help = "Apply embedded database migrations before serving")]
    pub migrate: bool,
}

fn parse_environment(value: &str) -> Result<Environment, String> {
    Environment::parse(value).ok_or_else(|| format!("unknown environment '{}'", value))
}

impl Cli {
    /// Flags win over environment variables, which win over presets.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::load(self.environment);

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dsn) = &self.db_dsn {
            config.database.dsn = dsn.clone();
        }
        if let Some(n) = self.db_max_open_conns {
            config.database.max_connections = n;
        }
        if let Some(secs) = self.db_max_idle_time {
            config.database.max_idle_time_secs = secs;
        }
        if let Some(secs) = self.db_query_timeout {
            config.database.query_timeout_secs = secs;
        }
        if let Some(origins) = &self.cors_trusted_origins {
            config.security.cors_trusted_origins = split_origins(origins);
        }
        config
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    tracing::info!("Starting kpop-api in {} mode", config.environment.as_str());

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    if cli.migrate {
        DatabaseManager::migrate(&pool)
            .await
            .context("failed to apply migrations")?;
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let environment = config.environment;

    let state = AppState::new(config, pool.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("starting {} server on {}", environment.as_str(), bind_addr);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("closing database pool");
    if tokio::time::timeout(grace, pool.close()).await.is_err() {
        tracing::warn!("database pool did not close within {:?}", grace);
    }
    tracing::info!("stopped server");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = on_signal("Ctrl+C", signal::ctrl_c());

    #[cfg(unix)]
    let terminate = on_signal("SIGTERM", async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<_, std::io::Error>(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down server");
}

/// Resolves when `received` does. A handler that failed to install never fires.
async fn on_signal<E: std::fmt::Display>(name: &str, received: impl Future<Output = Result<(), E>>) {
    if let Err(e) = received.await {
        tracing::error!("failed to install {} handler: {}", name, e);
        std::future::pending::<()>().await;
    }
}
