// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Command implementations.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use alexandria_core::config::Settings;
use alexandria_core::domain::identity::{RequestContext, UserContext};
use alexandria_core::presentation::{app, AppState};

use crate::bootstrap::build_state;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn serve(bind: Option<String>, metrics_port: Option<u16>) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(bind) = bind {
        settings.bind_addr = bind;
    }

    if let Some(port) = metrics_port {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("failed to install the Prometheus exporter")?;
        info!(port, "metrics exporter listening");
    }

    let state = build_state(settings.clone()).await?;
    spawn_sweepers(state.clone());

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "alexandria listening");

    axum::serve(listener, router).await.context("server exited")?;
    Ok(())
}

/// Periodic maintenance: expired-trash purge and stale-upload collection.
fn spawn_sweepers(state: Arc<AppState>) {
    let trash = state.trash.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match trash.cleanup_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired trash purged"),
                Err(e) => error!(error = %e, "trash sweep failed"),
            }
        }
    });

    let files = state.files.clone();
    let max_age = state.settings.upload_registry_max_age_seconds;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let swept = files.sweep_stale_uploads(max_age).await;
            if swept > 0 {
                warn!(swept, "stale uploads aborted");
            }
        }
    });
}

pub async fn create_library(name: String, owner: Uuid, description: Option<String>) -> Result<()> {
    let state = build_state(Settings::from_env()).await?;

    let mut user = UserContext::system();
    user.user_id = owner;
    let ctx = RequestContext::new(user, Uuid::new_v4());

    let library = state
        .libraries
        .create(&ctx, name, description)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{}", serde_json::to_string_pretty(&library)?);
    Ok(())
}

pub async fn list_libraries() -> Result<()> {
    let state = build_state(Settings::from_env()).await?;
    let ctx = RequestContext::system();

    let libraries = state
        .libraries
        .list(&ctx)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    for library in libraries {
        println!(
            "{}  {:<30}  bucket={}  mcp_write={}",
            library.id, library.name, library.bucket_name, library.mcp_write_enabled
        );
    }
    Ok(())
}

pub async fn reindex(library_id: Uuid) -> Result<()> {
    let state = build_state(Settings::from_env()).await?;

    info!(%library_id, "reindex starting");
    let (indexed, failed) = state.indexer.reindex_library(library_id).await?;
    println!("reindexed {indexed} files ({failed} failed)");
    Ok(())
}

pub async fn trash_sweep() -> Result<()> {
    let state = build_state(Settings::from_env()).await?;
    let purged = state
        .trash
        .cleanup_expired()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("purged {purged} expired items");
    Ok(())
}
