use std::future::Future;
use std::time::Duration;

use ims_tracker_core::{Endpoint, FetchError};
use tracing::warn;

use crate::context::RequestContext;

const MAX_RETRY_BUDGET: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Budgets above one are clamped; a possibly-down backend is never hammered.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries: max_retries.min(MAX_RETRY_BUDGET), delay }
    }

    pub fn none() -> Self {
        Self { max_retries: 0, delay: Duration::ZERO }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(200))
    }
}

/// Runs `attempt`, retrying only network-level failures and never HTTP status
/// or envelope errors.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    endpoint: Endpoint,
    context: &RequestContext,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(error) if error.is_network() && retries < policy.max_retries => {
                retries += 1;
                warn!(
                    event_name = "tracker.http.retry",
                    correlation_id = %context.correlation_id,
                    endpoint = endpoint.as_str(),
                    retry = retries,
                    error = %error,
                    "retrying read after network failure"
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            outcome => return outcome,
        }
    }
}
