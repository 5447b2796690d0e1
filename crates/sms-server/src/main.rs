//! stake-math-server binary

use anyhow::Context;
use clap::Parser;
use sms_server::{build_router, init_tracing, AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let settings = Settings::parse().anchored(&cwd);
    init_tracing(settings.log_json);

    let rendered = serde_json::to_string(&settings).context("cannot render settings")?;
    tracing::info!(settings = %rendered, "starting stake math workspace service");
    if !settings.template_dir().is_dir() {
        tracing::warn!(template = %settings.template_dir().display(), "template folder is missing; game creation will fail");
    }

    let app = build_router(AppState::from_settings(&settings)).layer(settings.cors_layer());
    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("cannot bind {}", settings.bind))?;
    tracing::info!(addr = %settings.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
