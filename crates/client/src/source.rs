use async_trait::async_trait;

use ims_tracker_core::{
    ApprovalId, ApprovalStepRecord, FetchError, RequestListing, RequestSummary,
    WingHistoryListing,
};

use crate::context::RequestContext;

/// Read-only access to the approval backend.
#[async_trait]
pub trait ApprovalSource: Send + Sync {
    async fn fetch_summary(
        &self,
        approval_id: &ApprovalId,
        context: &RequestContext,
    ) -> Result<RequestSummary, FetchError>;

    async fn fetch_history(
        &self,
        approval_id: &ApprovalId,
        context: &RequestContext,
    ) -> Result<Vec<ApprovalStepRecord>, FetchError>;

    async fn fetch_my_requests(
        &self,
        user_id: &str,
        context: &RequestContext,
    ) -> Result<RequestListing, FetchError>;

    async fn fetch_wing_history(
        &self,
        context: &RequestContext,
    ) -> Result<WingHistoryListing, FetchError>;
}
