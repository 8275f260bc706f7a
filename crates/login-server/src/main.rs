use clap::Parser;
use login_server::{build_cors_layer, config::ServerConfig, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    config.validate()?;

    tracing::info!(
        "Session transport: {:?}, token lifetime: {}s",
        config.session_transport,
        config.session_ttl_secs
    );

    let state = AppState::from_config(&config)?;
    let app = router(state, build_cors_layer(config.cors_allowed_origins.as_deref()));

    tracing::info!("Server listening on {}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
