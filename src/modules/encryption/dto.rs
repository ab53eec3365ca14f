use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::model::JobState;
use super::registry::JobRecord;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Client-chosen job id, so the per-job progress feed can be opened
    /// before the upload starts. Generated when absent.
    pub job: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub file_name: String,
    pub state: JobState,
    pub created_at: String,
    pub finished_at: Option<String>,
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            state: record.state,
            created_at: rfc3339(record.created_at),
            finished_at: record.finished_at.map(rfc3339),
        }
    }
}
