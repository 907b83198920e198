use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use badge_gen::{
    badge::BadgeRenderer,
    cache::{self, SharedCache},
    config::Config,
    services::{HandlerDependencies, ServiceRegistry, register_builtin_handlers},
    utils::UpstreamClient,
    web::{AppState, WebServer, shutdown_signal},
};

#[derive(Parser)]
#[command(name = "badge-gen")]
#[command(version)]
#[command(about = "Generates SVG status badges for projects and services")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT", env = "PORT")]
    port: Option<u16>,

    /// Cache URI, e.g. mem:// (overrides config file)
    #[arg(long, value_name = "URI")]
    cache: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("badge_gen={},tower_http=trace", cli.log_level)
    } else {
        format!("badge_gen={}", cli.log_level)
    };
    let (text_layer, json_layer) = if cli.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(text_layer)
        .with(json_layer)
        .init();

    info!("Starting badge-gen v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(cache_uri) = cli.cache {
        config.cache.uri = cache_uri;
    }

    let cache = cache::from_uri(&config.cache.uri)?;
    info!("Using cache {}", config.cache.uri);

    let deps = HandlerDependencies {
        cache: cache.clone(),
        http: UpstreamClient::new(&config.upstream)?,
        config: Arc::new(config.config_store()),
    };

    let mut registry = ServiceRegistry::new();
    register_builtin_handlers(&mut registry, &deps)?;
    info!(
        "Registered {} service handlers ({} enabled)",
        registry.len(),
        registry.enabled_len()
    );

    let renderer = BadgeRenderer::new()?;

    let cancellation_token = CancellationToken::new();
    let sweeper = tokio::spawn(sweep_cache(
        cache.clone(),
        config.cache.sweep_interval,
        cancellation_token.clone(),
    ));

    let server = WebServer::new(AppState {
        registry: Arc::new(registry),
        renderer: Arc::new(renderer),
        cache,
        config: Arc::new(config),
    })?;
    info!("Web server configured on {}:{}", server.host(), server.port());

    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let result = server.serve_with_cancellation(cancellation_token.clone()).await;
    cancellation_token.cancel();
    if let Err(e) = sweeper.await {
        warn!("Cache sweeper task failed: {}", e);
    }

    info!("badge-gen stopped");
    result
}

/// Periodically drop expired cache entries until cancelled
async fn sweep_cache(
    cache: SharedCache,
    interval: std::time::Duration,
    cancellation_token: CancellationToken,
) {
    if interval.is_zero() {
        debug!("Cache sweeping disabled");
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            _ = ticker.tick() => match cache.purge_expired() {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired cache entries"),
                Err(e) => warn!("Cache sweep failed: {}", e),
            },
        }
    }
}
