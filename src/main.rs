//! FPV leaderboard binary entrypoint wiring the REST API to the selected result store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fpv_leaderboard_back::{
    config::AppConfig,
    dao::{
        evidence::FsEvidenceStore,
        result_store::{ResultStore, memory::MemoryResultStore},
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[cfg(feature = "couch-store")]
use fpv_leaderboard_back::dao::result_store::couchdb::{CouchConfig, CouchResultStore};
#[cfg(feature = "mongo-store")]
use fpv_leaderboard_back::dao::result_store::mongodb::{MongoConfig, MongoResultStore};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Local offset detection refuses to run once other threads exist.
    let config = AppConfig::load();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(serve(config))
}

/// Install storage, then serve HTTP until a shutdown signal arrives.
async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let evidence = Arc::new(FsEvidenceStore::new(config.evidence_dir().clone()));
    let app_state = AppState::new(config, evidence);

    spawn_storage(app_state.clone())?;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the storage supervisor for the backend named by `STORAGE_BACKEND`.
fn spawn_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| default_backend().to_owned());
    info!(%backend, "selecting storage backend");

    match backend.as_str() {
        "memory" => {
            tokio::spawn(storage_supervisor::run(state, || async {
                Ok(Arc::new(MemoryResultStore::new()) as Arc<dyn ResultStore>)
            }));
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            tokio::spawn(storage_supervisor::run(state, || {
                async {
                    let config = MongoConfig::from_env().await?;
                    let store = MongoResultStore::connect(config).await?;
                    Ok(Arc::new(store) as Arc<dyn ResultStore>)
                }
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            let config = CouchConfig::from_env().context("reading CouchDB settings")?;
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = CouchResultStore::connect(config).await?;
                    Ok(Arc::new(store) as Arc<dyn ResultStore>)
                }
            }));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
    Ok(())
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
