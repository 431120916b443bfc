use ims_tracker_client::{load_wing_history, ApprovalSource, RequestContext};
use ims_tracker_core::RequestQuery;

use crate::commands::requests::{query, BoardPayload};
use crate::commands::{block_on, http_source, to_json, CommandResult, EXIT_OK};
use crate::render;

const COMMAND: &str = "wing-history";

pub fn run(status: Option<&str>, search: Option<String>, json_output: bool) -> CommandResult {
    let source = match http_source(COMMAND) {
        Ok(source) => source,
        Err(result) => return result,
    };
    let query = query(status, search);
    let context = RequestContext::new();

    block_on(COMMAND, execute(&source, &query, json_output, &context))
}

pub async fn execute<S>(
    source: &S,
    query: &RequestQuery,
    json_output: bool,
    context: &RequestContext,
) -> CommandResult
where
    S: ApprovalSource + ?Sized,
{
    match load_wing_history(source, query, context).await {
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
            CommandResult { exit_code: EXIT_OK, output: render::board("wing history", &board) }
        }
        Err(error) => CommandResult::fetch_failure(COMMAND, &error, context),
    }
}
