//! Dr. Snow Paws server entry point

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use snow_paws_config::{load_settings, Settings};
use snow_paws_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: flat vars > SNOW_PAWS__* > config/{env} > config/default > defaults
    let env = std::env::var("SNOW_PAWS_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            let mut settings = Settings::default();
            if let Err(e) = settings.apply_env_overrides(|key| std::env::var(key).ok()) {
                eprintln!("Warning: Ignoring invalid environment override: {}", e);
            }
            settings
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Dr. Snow Paws v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_path = env.as_deref().unwrap_or("default"),
        remote_enabled = config.remote_enabled(),
        "Configuration loaded"
    );
    if config.server.reload {
        tracing::info!("RELOAD requested; restarts are left to the process supervisor");
    }

    let client = reqwest::Client::builder()
        .timeout(config.openai.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let mut state =
        AppState::from_settings(config.clone(), client).context("failed to build turn pipeline")?;

    if config.observability.metrics_enabled {
        if let Some(handle) = init_metrics() {
            state = state.with_metrics(handle);
            tracing::info!("Prometheus metrics available at /metrics");
        }
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!(
        "Listening on {}:{}",
        config.server.host,
        config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("snow_paws={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
