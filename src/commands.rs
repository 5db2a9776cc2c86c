use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::http::{AppState, router};
use crate::mcp::{Dispatcher, Implementation};

/// Build the shared server state from configuration
#[inline]
pub fn build_state(config: &Config) -> Result<AppState> {
    let dispatcher =
        Dispatcher::with_builtin_tools().context("Failed to build the tool dispatcher")?;

    let server_info = Implementation {
        name: config.server.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(AppState::new(
        Arc::new(dispatcher),
        server_info,
        config.server.keep_alive(),
    ))
}

/// Run the HTTP server until Ctrl-C
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    let state = build_state(&config)?;
    let app = router(state.clone());

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_address()))?;

    info!(
        "{} v{} listening on {}",
        state.server_info.name,
        state.server_info.version,
        listener.local_addr()?
    );
    info!(
        "Serving {} tools: {}",
        state.dispatcher.registry().len(),
        state.dispatcher.registry().names().join(", ")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutdown requested");
    state.shutdown();
}

/// Print the advertised tool list as JSON
#[inline]
pub fn list_tools() -> Result<()> {
    let dispatcher = Dispatcher::with_builtin_tools()?;
    let listing = serde_json::to_string_pretty(&dispatcher.list_tools())?;
    println!("{}", listing);
    Ok(())
}
