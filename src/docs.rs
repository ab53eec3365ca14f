use utoipa::OpenApi;

use crate::modules::encryption::dto::JobStatusResponse;
use crate::modules::encryption::model::JobState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::encryption::handler::index,
        crate::modules::encryption::handler::upload_video,
        crate::modules::encryption::handler::get_job,
        crate::modules::progress::sse_handler::video_progress,
    ),
    components(
        schemas(
            JobState,
            JobStatusResponse,
        )
    ),
    tags(
        (name = "Encryption", description = "Upload and AES-128 HLS encryption"),
        (name = "Progress", description = "Live transcoding progress feed")
    )
)]
pub struct ApiDoc;
