//! photoreview service entry point.

use anyhow::Result;
use photoreview::config::Config;
use photoreview::AppState;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting photoreview service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    config.ensure_directories()?;
    info!("Database: {}", config.db_path.display());
    info!("Uploads: {}", config.uploads_dir.display());

    let db_pool = photoreview::db::init_database_pool(&config.db_path).await?;
    info!("Database connection established");

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db_pool, config);
    let app = photoreview::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
