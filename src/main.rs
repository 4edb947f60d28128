use std::sync::Arc;

use course_chapters::config::CONFIG;
use course_chapters::db::{ChapterStorage, connect};
use course_chapters::middleware::ApiKey;
use course_chapters::router::{ChapterState, chapter_router};
use course_chapters::service::ChapterService;
use course_chapters::uploads::UploadStore;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        upload_dir = %cfg.upload_dir.display(),
        loglevel = %cfg.loglevel,
        api_key = cfg.api_key.is_some()
    );
    if cfg.api_key.is_none() {
        warn!("no api_key configured; chapter routes are open");
    }

    let pool = connect(&cfg.database_url).await?;
    let storage = ChapterStorage::new(pool.clone());
    storage.init_schema().await?;

    let uploads = UploadStore::new(
        cfg.upload_dir.clone(),
        cfg.image_url_prefix.clone(),
        cfg.max_upload_bytes,
    );
    uploads.ensure_dir().await?;

    let api_key = ApiKey(cfg.api_key.as_deref().map(Arc::from));
    let state = ChapterState::new(ChapterService::new(storage, uploads), api_key);
    let app = chapter_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("database pool closed; bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
