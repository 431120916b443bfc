use ims_tracker_client::{load_my_requests, ApprovalSource, RequestBoard, RequestContext};
use ims_tracker_core::{RequestQuery, RequestStatus};
use serde::Serialize;

use crate::commands::{block_on, http_source, to_json, CommandResult, EXIT_OK};
use crate::render;

const COMMAND: &str = "requests";

#[derive(Debug, Serialize)]
pub(crate) struct BoardPayload<'a> {
    pub command: &'static str,
    pub status: &'static str,
    pub correlation_id: &'a str,
    pub board: &'a RequestBoard,
}

/// Builds the listing query from raw CLI flags; blank values mean "no filter".
pub fn query(status: Option<&str>, search: Option<String>) -> RequestQuery {
    RequestQuery {
        status: status
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(|status| RequestStatus::from(status.to_string())),
        search: search.filter(|search| !search.trim().is_empty()),
    }
}

pub fn run(
    user_id: &str,
    status: Option<&str>,
    search: Option<String>,
    json_output: bool,
) -> CommandResult {
    let source = match http_source(COMMAND) {
        Ok(source) => source,
        Err(result) => return result,
    };
    let query = query(status, search);
    let context = RequestContext::new();

    block_on(COMMAND, execute(&source, user_id, &query, json_output, &context))
}

pub async fn execute<S>(
    source: &S,
    user_id: &str,
    query: &RequestQuery,
    json_output: bool,
    context: &RequestContext,
) -> CommandResult
where
    S: ApprovalSource + ?Sized,
{
    match load_my_requests(source, user_id, query, context).await {
        Ok(board) if json_output => to_json(
            COMMAND,
            &BoardPayload {
                command: COMMAND,
                status: "ok",
                correlation_id: &context.correlation_id,
                board: &board,
            },
        ),
        Ok(board) => {
            CommandResult { exit_code: EXIT_OK, output: render::board("my requests", &board) }
        }
        Err(error) => CommandResult::fetch_failure(COMMAND, &error, context),
    }
}
