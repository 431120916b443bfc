use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ims_tracker_core::{ErrorBanner, Timeline};
use tokio::sync::RwLock;
use tracing::debug;

use crate::context::RequestContext;
use crate::source::ApprovalSource;
use crate::tracker::TimelineTracker;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Idle,
    Loading {
        approval_id: String,
        generation: u64,
    },
    Ready(Arc<Timeline>),
    Failed(ErrorBanner),
}

impl ViewState {
    pub fn timeline(&self) -> Option<&Arc<Timeline>> {
        match self {
            Self::Ready(timeline) => Some(timeline),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed(ViewState),
    /// A newer load started before this one finished; its result was dropped.
    Discarded { generation: u64, current: u64 },
}

/// Holds the timeline shown for one request id at a time.
///
/// Every load takes a fresh generation. Only the load holding the latest
/// generation may write state, so a slow response for an earlier id can never
/// overwrite a newer one.
pub struct TimelineView<S> {
    tracker: TimelineTracker<S>,
    generation: AtomicU64,
    state: RwLock<ViewState>,
}

impl<S> TimelineView<S>
where
    S: ApprovalSource,
{
    pub fn new(tracker: TimelineTracker<S>) -> Self {
        Self { tracker, generation: AtomicU64::new(0), state: RwLock::new(ViewState::Idle) }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> ViewState {
        self.state.read().await.clone()
    }

    /// Drops whatever is shown and invalidates loads still in flight.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().await = ViewState::Idle;
    }

    pub async fn load(&self, raw_approval_id: &str, context: &RequestContext) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.state.write().await;
            if self.generation() == generation {
                *state = ViewState::Loading {
                    approval_id: raw_approval_id.trim().to_string(),
                    generation,
                };
            }
        }

        let next = match self.tracker.load_timeline(raw_approval_id, context).await {
            Ok(timeline) => ViewState::Ready(Arc::new(timeline)),
            Err(error) => ViewState::Failed(error.into_banner(context.correlation_id.clone())),
        };

        let mut state = self.state.write().await;
        let current = self.generation();
        if current != generation {
            debug!(
                event_name = "tracker.timeline.stale_discarded",
                correlation_id = %context.correlation_id,
                approval_id = raw_approval_id.trim(),
                generation,
                current,
                "discarding result of superseded load"
            );
            return LoadOutcome::Discarded { generation, current };
        }

        *state = next.clone();
        LoadOutcome::Committed(next)
    }
}
