use axum::Router;
use crate::state::AppState;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    crate::routes::configure_routes(&state)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
