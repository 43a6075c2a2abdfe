use notes_dock::config::Config;
use notes_dock::logging::init_logging;
use notes_dock::router::app_router;
use notes_dock::state::AppState;
use notes_dock::storage::{HttpObjectStore, ObjectStore};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = Config::from_env()?;
    let store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(&config));

    let port = config.port;
    let state = AppState::new(config, store);
    let app = app_router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Portal listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
