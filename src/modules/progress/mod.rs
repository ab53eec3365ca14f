use crate::state::AppState;
use axum::Router;
use axum::routing::get;

pub mod hub;
pub mod publisher;
pub mod queue;
pub mod sse_handler;

pub fn router() -> Router<AppState> {
    Router::new().route("/video-progress", get(sse_handler::video_progress))
}
