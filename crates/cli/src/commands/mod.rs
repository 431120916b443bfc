pub mod config;
pub mod doctor;
pub mod requests;
pub mod timeline;
pub mod wing_history;

use ims_tracker_client::{HttpApprovalSource, RequestContext};
use ims_tracker_core::config::{AppConfig, LoadOptions};
use ims_tracker_core::{FetchError, LoadError};
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INVALID_INPUT: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_LOAD_FAILED: u8 = 5;
pub const EXIT_RUNTIME: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Error payload printed by every command that cannot produce its normal output.
#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    command: &'a str,
    status: &'static str,
    error_class: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl<'a> ErrorPayload<'a> {
    fn new(command: &'a str, error_class: &'a str, message: String) -> Self {
        Self { command, status: "error", error_class, message, correlation_id: None, retryable: None }
    }

    fn traced(mut self, correlation_id: &'a str, retryable: bool) -> Self {
        self.correlation_id = Some(correlation_id);
        self.retryable = Some(retryable);
        self
    }

    fn into_result(self, exit_code: u8) -> CommandResult {
        let output = serde_json::to_string(&self).unwrap_or_else(|error| {
            let detail = error.to_string().replace('\\', "\\\\").replace('"', "\\\"");
            format!("{{\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{detail}\"}}")
        });
        CommandResult { exit_code, output }
    }
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        ErrorPayload::new(command, error_class, message.into()).into_result(exit_code)
    }

    pub fn load_failure(command: &str, error: LoadError, context: &RequestContext) -> Self {
        let exit_code = match error {
            LoadError::InvalidRequestId => EXIT_INVALID_INPUT,
            LoadError::NotFound { .. } => EXIT_NOT_FOUND,
            _ => EXIT_LOAD_FAILED,
        };
        let banner = error.into_banner(context.correlation_id.clone());

        ErrorPayload::new(command, banner.class, format!("{} ({})", banner.message, banner.detail))
            .traced(&banner.correlation_id, banner.retryable)
            .into_result(exit_code)
    }

    pub fn fetch_failure(command: &str, error: &FetchError, context: &RequestContext) -> Self {
        let (error_class, exit_code) = match error {
            FetchError::NotFound { .. } => ("not_found", EXIT_NOT_FOUND),
            FetchError::InvalidInput { .. } => ("invalid_input", EXIT_INVALID_INPUT),
            FetchError::Timeout { .. } | FetchError::Transport { .. } => {
                ("network", EXIT_LOAD_FAILED)
            }
            _ => ("upstream", EXIT_LOAD_FAILED),
        };

        ErrorPayload::new(command, error_class, error.to_string())
            .traced(&context.correlation_id, error.is_network())
            .into_result(exit_code)
    }
}

/// Loads config and builds the HTTP source, or the failure result to print.
pub(crate) fn http_source(command: &str) -> Result<HttpApprovalSource, CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })?;

    HttpApprovalSource::from_config(&config.api).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })
}

pub(crate) fn block_on<F>(command: &str, future: F) -> CommandResult
where
    F: std::future::Future<Output = CommandResult>,
{
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(error) => CommandResult::failure(
            command,
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        ),
    }
}

pub(crate) fn to_json<T: Serialize>(command: &str, value: &T) -> CommandResult {
    match serde_json::to_string_pretty(value) {
        Ok(output) => CommandResult { exit_code: EXIT_OK, output },
        Err(error) => CommandResult::failure(command, "serialization", error.to_string(), EXIT_RUNTIME),
    }
}
