/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Process wiring: store, engine, janitor and HTTP listener.

use anyhow::{Context, Result};
use ferry::{
    Database, DeliveryPool, HttpCallbackDispatcher, Janitor, RelayEngine, SystemClock, DAL,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::allow_list::OriginAllowList;
use crate::config::FerryConfig;
use crate::http::{router, AppState};

/// Opens the store, applies migrations and provisions the configured
/// categories.
pub async fn open_store(config: &FerryConfig) -> Result<DAL> {
    let database =
        Database::try_new(&config.database.url).context("Failed to open the request store")?;
    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;

    let dal = DAL::new(database);
    for category in &config.relay.categories {
        dal.counters()
            .provision(category)
            .await
            .with_context(|| format!("Failed to provision category '{}'", category))?;
    }

    Ok(dal)
}

/// Builds the engine over `dal` with HTTP callback delivery.
pub fn build_engine(config: &FerryConfig, dal: DAL) -> Result<RelayEngine> {
    let dispatcher = HttpCallbackDispatcher::new(config.dispatcher_config())
        .context("Failed to build the callback HTTP client")?;
    let deliveries = DeliveryPool::new(Arc::new(dispatcher));

    Ok(RelayEngine::new(
        dal,
        deliveries,
        Arc::new(SystemClock),
        config.relay_config(),
    ))
}

/// Runs the relay until `shutdown` resolves.
///
/// On shutdown the listener stops accepting, the janitor is stopped, and
/// callbacks already in flight are allowed to finish.
pub async fn serve<F>(config: FerryConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let dal = open_store(&config).await?;
    let engine = build_engine(&config, dal)?;

    let janitor = Janitor::for_engine(&engine, config.janitor_config()).start();

    let origins = OriginAllowList::new(config.server.allowed_origins.iter().cloned());
    let app = router(AppState::new(engine.clone(), origins));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!(
        address = %listener.local_addr().context("Listener has no local address")?,
        public_url = %config.server.public_url,
        "Ferry relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    janitor.shutdown().await;
    let drained = engine.deliveries().drain().await;
    info!(drained, "Callback deliveries flushed");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
