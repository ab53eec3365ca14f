use dotenvy::dotenv;
use hls_vault::config::settings::AppConfig;
use hls_vault::{AppState, create_app};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new();

    if which::which(&config.ffmpeg_bin).is_err() {
        warn!("ffmpeg binary '{}' not found, uploads will fail until it is installed", config.ffmpeg_bin);
    }
    if !config.key_info_file.exists() {
        warn!("HLS key info file {} is missing", config.key_info_file.display());
    }
    if !config.key_file.exists() {
        warn!("HLS key file {} is missing", config.key_file.display());
    }
    info!(
        "Progress feed: polling every {:?}, queue capacity {}, order {:?}",
        config.progress_poll, config.progress_queue_capacity, config.progress_queue_order
    );

    let state = AppState::with_ffmpeg(config);
    state.storage.ensure_layout().await?;

    let addr = state.config.server_addr();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
