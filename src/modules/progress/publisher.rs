//! Polling publisher that turns a progress queue into an ordered event stream.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use tracing::debug;

use super::hub::ProgressHub;
use super::queue::ProgressQueue;
use crate::modules::encryption::model::JobId;
use crate::modules::encryption::registry::JobRegistry;

/// A message handed to the transport, stamped with its event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    pub id: u64,
    pub data: String,
}

struct JobScope {
    job: JobId,
    jobs: JobRegistry,
}

struct PublisherState {
    hub: ProgressHub,
    queue: Arc<ProgressQueue>,
    scope: Option<JobScope>,
    poll: Duration,
    just_emitted: bool,
}

/// Stream over the shared feed. Never ends on its own.
pub fn shared_stream(hub: ProgressHub, poll: Duration) -> impl Stream<Item = ProgressMessage> {
    let queue = hub.shared_feed();
    publish(PublisherState {
        hub,
        queue,
        scope: None,
        poll,
        just_emitted: false,
    })
}

/// Stream over a single job's feed. Ends once the job is terminal and every
/// message it produced has been sent.
///
/// A job that is already terminal and whose feed is gone (drained by an
/// earlier subscriber, or pruned) yields an empty stream and no new feed.
pub fn job_stream(
    hub: ProgressHub,
    jobs: JobRegistry,
    job: JobId,
    poll: Duration,
) -> impl Stream<Item = ProgressMessage> {
    if jobs.is_terminal(job) && !hub.has_feed(job) {
        debug!("Progress feed for job {} already closed", job);
        return stream::empty().left_stream();
    }

    let queue = hub.job_feed(job);
    publish(PublisherState {
        hub,
        queue,
        scope: Some(JobScope { job, jobs }),
        poll,
        just_emitted: false,
    })
    .right_stream()
}

fn publish(state: PublisherState) -> impl Stream<Item = ProgressMessage> {
    stream::unfold(state, |mut state| async move {
        // Pause between consecutive events as well as between empty polls.
        if state.just_emitted {
            tokio::time::sleep(state.poll).await;
            state.just_emitted = false;
        }

        loop {
            if let Some(data) = state.queue.pop() {
                let message = ProgressMessage {
                    id: state.hub.next_event_id(),
                    data,
                };
                state.just_emitted = true;
                return Some((message, state));
            }

            if let Some(scope) = &state.scope {
                // Jobs push everything before turning terminal, so an empty
                // queue observed afterwards has nothing left to send.
                let done = state.hub.is_finished(scope.job) || scope.jobs.is_terminal(scope.job);
                if done && state.queue.is_empty() {
                    // `finish` first so a feed re-created by a racing
                    // subscriber is dropped too.
                    state.hub.finish(scope.job);
                    state.hub.release(scope.job);
                    return None;
                }
            }

            tokio::time::sleep(state.poll).await;
        }
    })
}
