mod accounts;
mod api;
mod auth;
mod config;
mod error;
mod models;
mod notify;
mod retention;
mod sensors;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    accounts::AccountService,
    api::AppState,
    auth::{DeviceAuthenticator, SessionService, TokenService},
    config::Config,
    notify::{AlertWorker, Notifier},
    retention::RetentionSweeper,
    sensors::SensorService,
    store::{redis::RedisStore, SharedStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Arc::new(Config::from_env()?);

    // Connect to the store
    let store: SharedStore = Arc::new(
        RedisStore::connect(
            &config.redis_url,
            Duration::from_secs(config.store_timeout_secs),
        )
        .await?,
    );
    info!("Store ready");

    // Alert queue and worker — the write path only ever enqueues
    let (notifier, alert_rx) = Notifier::channel(config.alert_queue_capacity);
    {
        let worker = AlertWorker::new(alert_rx, store.clone(), config.push_endpoint.clone());
        tokio::spawn(worker.run());
    }

    // Retention sweep runs independently of request traffic
    {
        let sweeper = RetentionSweeper::new(
            store.clone(),
            config.retention_max_age_days,
            config.retention_interval_secs,
        );
        tokio::spawn(sweeper.run());
    }

    let tokens = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
        store.clone(),
    );
    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(SessionService::new(tokens, store.clone())),
        devices: Arc::new(DeviceAuthenticator::new(
            config.device_secret.clone(),
            config.device_auth_window_secs,
            store.clone(),
        )),
        sensors: Arc::new(SensorService::new(store.clone(), notifier)),
        accounts: Arc::new(AccountService::new(store)),
    };

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
