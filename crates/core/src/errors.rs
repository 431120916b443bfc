use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Summary,
    History,
    MyRequests,
    WingHistory,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::History => "history",
            Self::MyRequests => "my_requests",
            Self::WingHistory => "wing_history",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single endpoint read.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{endpoint} endpoint returned not found")]
    NotFound { endpoint: Endpoint },
    #[error("{endpoint} endpoint timed out after {timeout_secs}s")]
    Timeout { endpoint: Endpoint, timeout_secs: u64 },
    #[error("{endpoint} endpoint transport failure: {message}")]
    Transport { endpoint: Endpoint, message: String },
    #[error("{endpoint} endpoint returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint} endpoint returned a malformed envelope: {message}")]
    Envelope { endpoint: Endpoint, message: String },
    #[error("{endpoint} endpoint reported failure: {message}")]
    Rejected { endpoint: Endpoint, message: String },
    /// Caught locally; no request was sent.
    #[error("{endpoint} request is invalid: {message}")]
    InvalidInput { endpoint: Endpoint, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::NotFound { endpoint }
            | Self::Timeout { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Envelope { endpoint, .. }
            | Self::Rejected { endpoint, .. }
            | Self::InvalidInput { endpoint, .. } => *endpoint,
        }
    }

    /// Transport-level failures; the only kind that is ever retried.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    fn is_server_side(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("approval id must not be empty")]
    InvalidRequestId,
    #[error("approval `{approval_id}` was not found")]
    NotFound { approval_id: String },
    #[error("partial load, {failed} fetch failed: {source}")]
    PartialLoad { failed: Endpoint, source: FetchError },
    #[error("network failure: {0}")]
    Network(FetchError),
    #[error("upstream failure: {0}")]
    Upstream(FetchError),
}

impl LoadError {
    pub fn from_fetch(approval_id: &str, error: FetchError) -> Self {
        if error.is_not_found() {
            Self::NotFound { approval_id: approval_id.to_string() }
        } else if error.is_network() {
            Self::Network(error)
        } else {
            Self::Upstream(error)
        }
    }

    /// Joins the summary and history reads. Both must succeed; a summary 404
    /// is authoritative for existence, a single other failure is partial.
    pub fn join<S, H>(
        approval_id: &str,
        summary: Result<S, FetchError>,
        history: Result<H, FetchError>,
    ) -> Result<(S, H), Self> {
        match (summary, history) {
            (Ok(summary), Ok(history)) => Ok((summary, history)),
            (Err(error), _) if error.is_not_found() => Err(Self::from_fetch(approval_id, error)),
            (Err(error), Ok(_)) | (Ok(_), Err(error)) => {
                Err(Self::PartialLoad { failed: error.endpoint(), source: error })
            }
            (Err(error), Err(_)) => Err(Self::from_fetch(approval_id, error)),
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidRequestId => "invalid_request_id",
            Self::NotFound { .. } => "not_found",
            Self::PartialLoad { .. } => "partial_load",
            Self::Network(_) => "network",
            Self::Upstream(_) => "upstream",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidRequestId | Self::NotFound { .. } => false,
            Self::Network(_) => true,
            Self::PartialLoad { source, .. } | Self::Upstream(source) => {
                source.is_network() || source.is_server_side()
            }
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequestId => "A request id is required to show its tracking timeline.",
            Self::NotFound { .. } => "Request not found. Check the request id and try again.",
            Self::PartialLoad { .. } => {
                "Tracking data could not be loaded completely. Please retry."
            }
            Self::Network(_) => "The approval service could not be reached. Please retry shortly.",
            Self::Upstream(_) => "The approval service returned an unexpected response.",
        }
    }

    pub fn into_banner(self, correlation_id: impl Into<String>) -> ErrorBanner {
        ErrorBanner {
            class: self.class(),
            message: self.user_message(),
            detail: self.to_string(),
            retryable: self.is_retryable(),
            correlation_id: correlation_id.into(),
        }
    }
}

/// What a caller shows instead of the timeline when a load fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub class: &'static str,
    pub message: &'static str,
    pub detail: String,
    pub retryable: bool,
    pub correlation_id: String,
}
