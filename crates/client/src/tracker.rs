use std::sync::Arc;

use chrono::Utc;
use ims_tracker_core::{ApprovalId, LoadError, Timeline};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::source::ApprovalSource;

/// Loads one request's summary and history as a single atomic snapshot.
pub struct TimelineTracker<S> {
    source: Arc<S>,
}

impl<S> Clone for TimelineTracker<S> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source) }
    }
}

impl<S> TimelineTracker<S>
where
    S: ApprovalSource,
{
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub async fn load_timeline(
        &self,
        raw_approval_id: &str,
        context: &RequestContext,
    ) -> Result<Timeline, LoadError> {
        let approval_id = ApprovalId::parse(raw_approval_id).ok_or(LoadError::InvalidRequestId)?;

        let (summary, history) = tokio::join!(
            self.source.fetch_summary(&approval_id, context),
            self.source.fetch_history(&approval_id, context)
        );

        let (summary, history) =
            LoadError::join(approval_id.as_str(), summary, history).map_err(|error| {
                warn!(
                    event_name = if matches!(error, LoadError::PartialLoad { .. }) {
                        "tracker.timeline.partial_load"
                    } else {
                        "tracker.timeline.load_failed"
                    },
                    correlation_id = %context.correlation_id,
                    approval_id = %approval_id,
                    error_class = error.class(),
                    error = %error,
                    "timeline load failed"
                );
                error
            })?;

        let timeline = Timeline::assemble(approval_id, summary, history, Utc::now());

        for warning in &timeline.warnings {
            warn!(
                event_name = "tracker.timeline.consistency_warning",
                correlation_id = %context.correlation_id,
                approval_id = %timeline.approval_id,
                warning = warning.code(),
                "{}",
                warning.describe()
            );
        }

        info!(
            event_name = "tracker.timeline.loaded",
            correlation_id = %context.correlation_id,
            approval_id = %timeline.approval_id,
            steps = timeline.display.counts.total,
            phase = timeline.phase.as_str(),
            warnings = timeline.warnings.len(),
            "timeline loaded"
        );

        Ok(timeline)
    }
}
