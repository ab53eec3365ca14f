use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use super::publisher::{self, ProgressMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    /// Restrict the feed to one upload. Without it the shared feed is used.
    pub job: Option<Uuid>,
}

/// Live transcoding progress
/// Each event carries `event: message`, a process-wide increasing id and the
/// status text as data.
#[utoipa::path(
    get,
    path = "/video-progress",
    params(ProgressQuery),
    responses(
        (status = 200, description = "Server-sent event stream", body = String, content_type = "text/event-stream")
    ),
    tag = "Progress"
)]
pub async fn video_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let poll = state.config.progress_poll;

    let messages: BoxStream<'static, ProgressMessage> = match query.job {
        Some(job) => {
            info!("Progress client connected for job {}", job);
            publisher::job_stream(state.progress.clone(), state.jobs.clone(), job, poll).boxed()
        }
        None => {
            info!("Progress client connected to shared feed");
            publisher::shared_stream(state.progress.clone(), poll).boxed()
        }
    };

    let events = messages.map(|message| {
        Ok(Event::default()
            .id(message.id.to_string())
            .event("message")
            .data(message.data))
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
