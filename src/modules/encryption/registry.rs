use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use time::OffsetDateTime;
use tracing::warn;

use super::error::EncryptError;
use super::model::{JobId, JobState};

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub file_name: String,
    pub state: JobState,
    pub created_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

/// In-memory lifecycle record of every upload since startup.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: JobId, file_name: &str) -> Result<(), EncryptError> {
        let mut jobs = self.lock();
        if jobs.contains_key(&id) {
            return Err(EncryptError::DuplicateJob(id));
        }
        jobs.insert(
            id,
            JobRecord {
                id,
                file_name: file_name.to_string(),
                state: JobState::Idle,
                created_at: OffsetDateTime::now_utc(),
                finished_at: None,
            },
        );
        Ok(())
    }

    /// Moves a job to `next`, ignoring transitions the state machine forbids.
    pub fn transition(&self, id: JobId, next: JobState) -> bool {
        let mut jobs = self.lock();
        let Some(record) = jobs.get_mut(&id) else {
            warn!("State change for unknown job {}", id);
            return false;
        };

        if !record.state.can_transition_to(&next) {
            warn!("Rejected job {} transition {:?} -> {:?}", id, record.state, next);
            return false;
        }

        if next.is_terminal() {
            record.finished_at = Some(OffsetDateTime::now_utc());
        }
        record.state = next;
        true
    }

    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.lock().get(&id).cloned()
    }

    /// `false` for unknown jobs as well as running ones.
    pub fn is_terminal(&self, id: JobId) -> bool {
        self.lock().get(&id).is_some_and(|record| record.state.is_terminal())
    }
}
