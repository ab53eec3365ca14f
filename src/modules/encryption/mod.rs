use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

pub mod dto;
pub mod error;
pub mod handler;
pub mod model;
pub mod registry;
pub mod service;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route(
            "/video-upload",
            post(handler::upload_video).layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/video-jobs/{id}", get(handler::get_job))
}
