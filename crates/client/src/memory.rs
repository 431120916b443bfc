use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ims_tracker_core::{
    ApprovalId, ApprovalStepRecord, Endpoint, FetchError, RequestListing, RequestSummary,
    WingHistoryListing,
};
use tokio::sync::RwLock;

use crate::context::RequestContext;
use crate::source::ApprovalSource;

/// Scriptable in-process source: fixed data, per-endpoint failures and
/// per-approval latency.
#[derive(Default)]
pub struct InMemoryApprovalSource {
    summaries: RwLock<HashMap<String, RequestSummary>>,
    histories: RwLock<HashMap<String, Vec<ApprovalStepRecord>>>,
    my_requests: RwLock<HashMap<String, RequestListing>>,
    wing_history: RwLock<Option<WingHistoryListing>>,
    failures: RwLock<HashMap<Endpoint, FetchError>>,
    delays: RwLock<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl InMemoryApprovalSource {
    pub async fn insert_timeline(
        &self,
        approval_id: &ApprovalId,
        summary: RequestSummary,
        history: Vec<ApprovalStepRecord>,
    ) {
        self.summaries.write().await.insert(approval_id.0.clone(), summary);
        self.histories.write().await.insert(approval_id.0.clone(), history);
    }

    pub async fn insert_my_requests(&self, user_id: &str, listing: RequestListing) {
        self.my_requests.write().await.insert(user_id.to_string(), listing);
    }

    pub async fn set_wing_history(&self, listing: WingHistoryListing) {
        *self.wing_history.write().await = Some(listing);
    }

    /// Every call to `endpoint` fails with `error` until cleared.
    pub async fn fail_endpoint(&self, endpoint: Endpoint, error: FetchError) {
        self.failures.write().await.insert(endpoint, error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    pub async fn delay_approval(&self, approval_id: &ApprovalId, delay: Duration) {
        self.delays.write().await.insert(approval_id.0.clone(), delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, endpoint: Endpoint, key: Option<&str>) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = match key {
            Some(key) => self.delays.read().await.get(key).copied(),
            None => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.read().await.get(&endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApprovalSource for InMemoryApprovalSource {
    async fn fetch_summary(
        &self,
        approval_id: &ApprovalId,
        _context: &RequestContext,
    ) -> Result<RequestSummary, FetchError> {
        self.enter(Endpoint::Summary, Some(approval_id.as_str())).await?;
        self.summaries
            .read()
            .await
            .get(approval_id.as_str())
            .cloned()
            .ok_or(FetchError::NotFound { endpoint: Endpoint::Summary })
    }

    async fn fetch_history(
        &self,
        approval_id: &ApprovalId,
        _context: &RequestContext,
    ) -> Result<Vec<ApprovalStepRecord>, FetchError> {
        self.enter(Endpoint::History, Some(approval_id.as_str())).await?;
        self.histories
            .read()
            .await
            .get(approval_id.as_str())
            .cloned()
            .ok_or(FetchError::NotFound { endpoint: Endpoint::History })
    }

    async fn fetch_my_requests(
        &self,
        user_id: &str,
        _context: &RequestContext,
    ) -> Result<RequestListing, FetchError> {
        self.enter(Endpoint::MyRequests, None).await?;
        Ok(self
            .my_requests
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or(RequestListing { requests: Vec::new(), total: Some(0) }))
    }

    async fn fetch_wing_history(
        &self,
        _context: &RequestContext,
    ) -> Result<WingHistoryListing, FetchError> {
        self.enter(Endpoint::WingHistory, None).await?;
        self.wing_history
            .read()
            .await
            .clone()
            .ok_or(FetchError::NotFound { endpoint: Endpoint::WingHistory })
    }
}
