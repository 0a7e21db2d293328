//! # playdir Binary
//!
//! The entry point that assembles the application based on compile-time
//! features and runtime settings.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pd_api::{router, AppState};
use pd_config::{Settings, StoreBackend, StoreSettings};
use pd_core::{DirectoryStore, Playground};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Settings { server, store, log } = Settings::load().context("loading configuration")?;
    pd_config::init_tracing(&log)?;

    let backend = store.backend;
    let store = build_store(store).await?;
    let app = router(AppState::new(store));

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, ?backend, "playground directory listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Playgrounds to preload into the memory or SQLite store.
fn read_seed(path: &Path) -> anyhow::Result<Vec<Playground>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}

async fn build_store(settings: StoreSettings) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    let seed = match &settings.seed_file {
        Some(path) => read_seed(path)?,
        None => Vec::new(),
    };
    match settings.backend {
        StoreBackend::Memory => memory_store(seed),
        StoreBackend::Sqlite => sqlite_store(&settings.sqlite_url, seed).await,
        StoreBackend::Firestore => {
            if !seed.is_empty() {
                tracing::warn!("store.seed_file is ignored for the hosted document store");
            }
            firestore_store(settings)
        }
    }
}

#[cfg(feature = "store-memory")]
fn memory_store(seed: Vec<Playground>) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    tracing::info!(playgrounds = seed.len(), "using in-memory store");
    Ok(Arc::new(pd_store_memory::MemoryDirectory::new(seed)))
}

#[cfg(not(feature = "store-memory"))]
fn memory_store(_seed: Vec<Playground>) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    anyhow::bail!("store.backend = \"memory\" needs the `store-memory` feature")
}

#[cfg(feature = "db-sqlite")]
async fn sqlite_store(url: &str, seed: Vec<Playground>) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    let directory = pd_db_sqlite::SqliteDirectory::connect(url)
        .await
        .with_context(|| format!("opening {url}"))?;
    for playground in &seed {
        directory.insert_playground(playground).await?;
    }
    tracing::info!(url, seeded = seed.len(), "using sqlite store");
    Ok(Arc::new(directory))
}

#[cfg(not(feature = "db-sqlite"))]
async fn sqlite_store(_url: &str, _seed: Vec<Playground>) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    anyhow::bail!("store.backend = \"sqlite\" needs the `db-sqlite` feature")
}

#[cfg(feature = "store-firestore")]
fn firestore_store(settings: StoreSettings) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    use pd_store_firestore::{FirestoreConfig, FirestoreDirectory};

    let firestore = settings
        .firestore
        .context("store.firestore section is missing")?;
    let config = FirestoreConfig {
        project_id: firestore.project_id,
        database: firestore.database,
        base_url: firestore.base_url,
        api_key: firestore.api_key,
        bearer_token: firestore.bearer_token,
    };
    tracing::info!(project = %config.project_id, database = %config.database, "using hosted document store");
    Ok(Arc::new(FirestoreDirectory::new(config)?))
}

#[cfg(not(feature = "store-firestore"))]
fn firestore_store(_settings: StoreSettings) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    anyhow::bail!("store.backend = \"firestore\" needs the `store-firestore` feature")
}
