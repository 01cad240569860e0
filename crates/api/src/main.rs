use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workdrive_bridge_api::{build_router, state::AppState};
use workdrive_bridge_config::Settings;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "workdrive_bridge_api=debug,workdrive_bridge_services=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!(
        "Starting WorkDrive bridge on {}:{}",
        settings.app.host, settings.app.port
    );
    if !settings.zoho.has_refresh_token() {
        warn!("No Zoho refresh token configured; visit / to authorize");
    }
    if settings.zoho.folder_id.is_empty() {
        warn!("No target WorkDrive folder configured");
    }

    // Build app state
    let app_state = AppState::new(settings.clone())?;

    // Ensure session and staging directories
    app_state.sessions.init().await?;
    tokio::fs::create_dir_all(&settings.app.upload_dir).await?;

    // Purge expired sessions in the background
    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired sessions", n),
                Err(e) => warn!("Session purge failed: {}", e),
            }
        }
    });

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
