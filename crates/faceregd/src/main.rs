use anyhow::{Context, Result};
use facereg_core::OnnxFaceEncoder;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod error;
mod routes;
mod store;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "faceregd starting");

    let config = config::Config::from_env()?;
    tracing::info!(
        bind = %config.bind,
        model_dir = %config.model_dir.display(),
        db_path = %config.db_path.display(),
        threshold = config.match_threshold,
        "configuration loaded"
    );

    // Models are loaded up front so a missing file fails startup, not the first request.
    let encoder = OnnxFaceEncoder::load_dir(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;

    let store = store::JsonStore::new(&config.db_path);
    if !store.exists() {
        tracing::warn!(
            path = %config.db_path.display(),
            "encoding database does not exist yet; recognition fails until the first registration"
        );
    }

    let engine = engine::spawn_engine(Box::new(encoder), store, config.match_threshold)?;
    let app = routes::router(engine, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "faceregd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("faceregd shutting down");
    Ok(())
}
