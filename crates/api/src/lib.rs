pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .settings
        .app
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        })
        .allow_methods(Any)
        .allow_headers(Any);

    // WorkDrive proxy routes
    let api_routes = Router::new()
        .route("/folders", get(routes::workdrive::folders))
        .route("/upload", post(routes::workdrive::upload))
        .route("/preview/{file_id}", get(routes::workdrive::preview))
        .route("/download/{file_id}", get(routes::workdrive::download))
        .route("/file/{file_id}", delete(routes::workdrive::delete))
        .route("/files", get(routes::workdrive::list));

    // Operator setup flow
    let setup_routes = Router::new()
        .route("/", get(routes::setup::index))
        .route("/callback", get(routes::setup::callback));

    Router::new()
        .merge(setup_routes)
        .nest("/api", api_routes)
        .route("/health", get(routes::health::health))
        .layer(DefaultBodyLimit::max(state.settings.app.max_upload_bytes))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session::session_layer,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
