use std::time::Instant;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, info};
use uuid::Uuid;

use super::dto::{JobStatusResponse, UploadQuery};
use super::error::EncryptError;
use super::service::EncryptionService;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, EncryptFailure};
use crate::common::template::{self, INDEX_TEMPLATE, VIDEO_TEMPLATE};
use crate::common::upload;
use crate::state::AppState;

/// Entry page
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Upload page", body = String, content_type = "text/html"),
        (status = 500, description = "Template missing")
    ),
    tag = "Encryption"
)]
pub async fn index(State(state): State<AppState>) -> Response {
    match template::load(&state.config.template_dir, INDEX_TEMPLATE).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to load {}: {}", INDEX_TEMPLATE, e);
            ApiError("Entry page unavailable".to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

/// Upload and encrypt a video
/// Stores the original, transcodes it into an AES-128 encrypted HLS playlist
/// and returns an HTML fragment pointing at it. Transcoding failures are
/// reported as plain text with status 200.
#[utoipa::path(
    post,
    path = "/video-upload",
    params(UploadQuery),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Player fragment, or `Failed to encrypt video: ...` text", body = String),
        (status = 400, description = "Malformed multipart body or missing `video` field"),
        (status = 413, description = "Upload exceeds the configured body limit"),
        (status = 409, description = "Job id already used")
    ),
    tag = "Encryption"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Response {
    let job_id = query.job.unwrap_or_else(Uuid::new_v4);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                error!("Malformed upload for job {}: {}", job_id, e);
                let status = e.status();
                return ApiError(format!("Malformed multipart body: {}", e.body_text()), status).into_response();
            }
        };

        if field.name() != Some("video") {
            continue;
        }

        let declared = field.file_name().unwrap_or_default().to_string();
        info!("Encrypting video {} as job {}", declared, job_id);

        let name = match EncryptionService::prepare(&state, job_id, &declared) {
            Ok(name) => name,
            Err(EncryptError::DuplicateJob(id)) => {
                return ApiError(format!("Job {} already exists", id), StatusCode::CONFLICT).into_response();
            }
            Err(e) => {
                error!("{}", e);
                return EncryptFailure(e.to_string()).into_response();
            }
        };

        let chunks = upload::field_chunks(field);
        tokio::pin!(chunks);

        let started = Instant::now();
        let result = EncryptionService::encrypt(&state, job_id, &name, chunks).await;
        info!(
            "Video encrypted, took: {:.3}ms",
            started.elapsed().as_secs_f64() * 1e3
        );

        if let Err(e) = result {
            // Body errors surfacing mid-field are transport errors too.
            if let EncryptError::Persist(upload) = &e {
                if let Some(status) = upload.client_status() {
                    return ApiError(format!("Malformed multipart body: {}", upload), status).into_response();
                }
            }
            return EncryptFailure(e.to_string()).into_response();
        }

        return match template::load(&state.config.template_dir, VIDEO_TEMPLATE).await {
            Ok(fragment) => Html(template::render_playlist(&fragment, &name.playlist_name())).into_response(),
            Err(e) => {
                let e = EncryptError::Template(e);
                error!("{}", e);
                EncryptFailure(e.to_string()).into_response()
            }
        };
    }

    ApiError::bad_request("No video field found in multipart request").into_response()
}

/// Job status
#[utoipa::path(
    get,
    path = "/video-jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = ApiResponse<JobStatusResponse>),
        (status = 404, description = "Unknown job")
    ),
    tag = "Encryption"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.jobs.get(id) {
        Some(record) => ApiSuccess(
            ApiResponse::success(JobStatusResponse::from(record), "Job retrieved successfully"),
            StatusCode::OK,
        )
        .into_response(),
        None => ApiError::not_found("Job not found").into_response(),
    }
}
