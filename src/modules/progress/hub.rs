use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::queue::{ProgressQueue, QueueOrder};
use crate::modules::encryption::model::JobId;

/// How many finished, never-drained job feeds are kept around before the
/// oldest ones are discarded.
const FINISHED_FEED_RETENTION: usize = 64;

struct JobFeed {
    queue: Arc<ProgressQueue>,
    finished: bool,
}

#[derive(Default)]
struct Feeds {
    jobs: HashMap<JobId, JobFeed>,
    finished_order: VecDeque<JobId>,
}

struct HubInner {
    shared: Arc<ProgressQueue>,
    feeds: Mutex<Feeds>,
    next_event_id: AtomicU64,
    capacity: usize,
    order: QueueOrder,
}

/// Routes progress messages from running jobs to their feeds.
///
/// Every message lands in the process-wide shared feed (which any client may
/// drain, regardless of whose upload produced it) and in the feed of the job
/// that produced it. Event ids come from one counter for the whole process.
#[derive(Clone)]
pub struct ProgressHub {
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new(capacity: usize, order: QueueOrder) -> Self {
        Self {
            inner: Arc::new(HubInner {
                shared: Arc::new(ProgressQueue::new(capacity, order)),
                feeds: Mutex::new(Feeds::default()),
                next_event_id: AtomicU64::new(0),
                capacity,
                order,
            }),
        }
    }

    fn feeds(&self) -> std::sync::MutexGuard<'_, Feeds> {
        self.inner.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shared_feed(&self) -> Arc<ProgressQueue> {
        self.inner.shared.clone()
    }

    /// Returns the feed for `job`, creating it if the job has not produced
    /// anything yet. Subscribers may open a feed before the upload arrives.
    pub fn job_feed(&self, job: JobId) -> Arc<ProgressQueue> {
        let mut feeds = self.feeds();
        feeds
            .jobs
            .entry(job)
            .or_insert_with(|| JobFeed {
                queue: Arc::new(ProgressQueue::new(self.inner.capacity, self.inner.order)),
                finished: false,
            })
            .queue
            .clone()
    }

    pub fn publish(&self, job: JobId, message: impl Into<String>) {
        let message = message.into();
        let feed = self.job_feed(job);
        self.inner.shared.push(message.clone());
        feed.push(message);
    }

    /// Marks `job` as terminal. Its feed is kept until a subscriber drains it
    /// or it falls out of the retention window.
    pub fn finish(&self, job: JobId) {
        let mut feeds = self.feeds();
        let Some(feed) = feeds.jobs.get_mut(&job) else {
            return;
        };
        if feed.finished {
            return;
        }
        feed.finished = true;
        feeds.finished_order.push_back(job);

        while feeds.finished_order.len() > FINISHED_FEED_RETENTION {
            if let Some(stale) = feeds.finished_order.pop_front() {
                debug!("Discarding undrained progress feed for job {}", stale);
                feeds.jobs.remove(&stale);
            }
        }
    }

    pub fn is_finished(&self, job: JobId) -> bool {
        self.feeds().jobs.get(&job).is_some_and(|feed| feed.finished)
    }

    /// Drops the feed of a finished job once its subscriber has drained it.
    pub fn release(&self, job: JobId) {
        let mut feeds = self.feeds();
        if feeds.jobs.get(&job).is_some_and(|feed| feed.finished) {
            feeds.jobs.remove(&job);
            feeds.finished_order.retain(|id| *id != job);
        }
    }

    pub fn has_feed(&self, job: JobId) -> bool {
        self.feeds().jobs.contains_key(&job)
    }

    pub fn next_event_id(&self) -> u64 {
        self.inner.next_event_id.fetch_add(1, Ordering::Relaxed)
    }
}
