use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use axum::Router;
use crate::state::AppState;

use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

pub fn configure_routes(state: &AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes())
        .merge(crate::modules::encryption::router(state))
        .merge(crate::modules::progress::router())
        .merge(static_routes(state))
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
}

/// Finished playlists and segments under `/video/*`, and the segment key.
fn static_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest_service("/video", ServeDir::new(state.storage.root()))
        .route_service("/enc.key", ServeFile::new(&state.config.key_file))
}
