use anyhow::{Context, Result};
use devmirror::api::{create_api_router, ApiState};
use devmirror::auth::SessionRegistry;
use devmirror::cache::DeviceCache;
use devmirror::config::{self, Config};
use devmirror::subscription::Subscriptions;
use devmirror::upstream::HttpUpstream;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devmirror=info".into()),
        )
        .init();

    info!("devmirror starting...");

    let config_path =
        std::env::var("DEVMIRROR_CONFIG").unwrap_or_else(|_| "devmirror.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        config::load_config(&config_path)
            .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", config_path, e))?
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        Config::default()
    };

    info!(
        listen_address = %config.server.listen_address,
        listen_port = config.server.listen_port,
        upstream = %config.upstream.base_url,
        auth_enabled = config.auth.enabled,
        "Configuration loaded"
    );

    let upstream = HttpUpstream::new(
        config.upstream.base_url.clone(),
        Duration::from_secs(config.upstream.request_timeout_seconds),
    )
    .context("Failed to build upstream client")?;

    let cache = Arc::new(DeviceCache::with_forward_capacity(
        Arc::new(upstream),
        config.events.forward_capacity,
    ));
    let (devices, updates) = cache
        .initialize()
        .await
        .context("Failed to initialize device cache")?;
    info!(devices = devices.len(), "Device cache initialized");

    let subscriptions = Arc::new(Subscriptions::with_subscriber_capacity(
        updates,
        config.events.subscriber_capacity,
    ));
    let sessions = Arc::new(SessionRegistry::new(
        config.auth.user.clone(),
        config.auth.password.clone(),
        config.auth.session_minutes,
    ));

    let router = create_api_router(ApiState {
        cache,
        subscriptions,
        sessions,
        auth_enabled: config.auth.enabled,
    });

    let addr = format!(
        "{}:{}",
        config.server.listen_address, config.server.listen_port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Serving API");

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
