use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::generate::ScriptGenerator;
use crate::{db, server, store};

/// Build the article-fetching HTTP client from `[fetch]`.
pub fn fetch_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.fetch_timeout()?)
        .user_agent(&config.fetch.user_agent)
        .build()
        .context("building fetch HTTP client")
}

pub async fn run(config: Config) -> Result<()> {
    let pool = db::create_pool(&config).await.context("creating database")?;
    let stored = store::count_scripts(&pool).await?;
    info!(db_path = %config.db_path().display(), scripts = stored, "database ready");

    let generator = ScriptGenerator::from_config(&config.ai).context("configuring AI providers")?;
    if generator.provider_names().is_empty() {
        warn!("no AI provider has an API key, scripts will use the local fallback generator");
    }

    let cancel = CancellationToken::new();

    let app_state = server::AppState {
        pool: pool.clone(),
        generator: Arc::new(generator),
        http: fetch_client(&config)?,
        timezone: config.timezone(),
    };

    let router = server::build_router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.podscript.listen)
        .await
        .with_context(|| format!("binding to {}", config.podscript.listen))?;

    info!(listen = %config.podscript.listen, "HTTP server listening");

    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
            })
            .await
    });

    wait_for_shutdown().await?;
    info!("shutdown signal received");

    cancel.cancel();

    // In-flight generations may be waiting on a provider; don't hang forever.
    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server exited with error"),
        Ok(Err(e)) => warn!(error = %e, "HTTP server task panicked"),
        Err(_) => warn!("HTTP server did not stop within {shutdown_timeout:?}"),
    }

    pool.close().await;
    info!("shutdown complete");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("registering SIGTERM handler")?;
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    Ok(())
}
