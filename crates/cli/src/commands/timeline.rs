use std::sync::Arc;

use ims_tracker_client::{ApprovalSource, RequestContext, TimelineTracker};
use ims_tracker_core::Timeline;
use serde::Serialize;

use crate::commands::{block_on, http_source, to_json, CommandResult, EXIT_OK};
use crate::render;

const COMMAND: &str = "timeline";

#[derive(Debug, Serialize)]
struct TimelinePayload<'a> {
    command: &'static str,
    status: &'static str,
    correlation_id: &'a str,
    timeline: &'a Timeline,
}

pub fn run(approval_id: &str, json_output: bool) -> CommandResult {
    let source = match http_source(COMMAND) {
        Ok(source) => source,
        Err(result) => return result,
    };
    let tracker = TimelineTracker::new(Arc::new(source));
    let context = RequestContext::new();

    block_on(COMMAND, execute(&tracker, approval_id, json_output, &context))
}

pub async fn execute<S>(
    tracker: &TimelineTracker<S>,
    approval_id: &str,
    json_output: bool,
    context: &RequestContext,
) -> CommandResult
where
    S: ApprovalSource,
{
    match tracker.load_timeline(approval_id, context).await {
        Ok(timeline) if json_output => to_json(
            COMMAND,
            &TimelinePayload {
                command: COMMAND,
                status: "ok",
                correlation_id: &context.correlation_id,
                timeline: &timeline,
            },
        ),
        Ok(timeline) => CommandResult { exit_code: EXIT_OK, output: render::timeline(&timeline) },
        Err(error) => CommandResult::load_failure(COMMAND, error, context),
    }
}
