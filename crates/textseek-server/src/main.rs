mod config;
mod metrics;
mod routes;

use config::ServerConfig;
use routes::{build_router, AppState};
use std::sync::Arc;
use textseek_storage::{load_documents, InMemoryStore, SearchService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;
    let store = match &config.data_file {
        Some(path) => {
            let docs = load_documents(path)?;
            info!(path = %path.display(), documents = docs.len(), "loaded documents");
            InMemoryStore::from_documents(docs)
        }
        None => InMemoryStore::new(),
    };

    let state = AppState {
        service: SearchService::new(Arc::new(store)),
        config: Arc::new(config.clone()),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("http listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
