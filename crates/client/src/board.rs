use ims_tracker_core::{
    filter_requests, tally_statuses, Endpoint, FetchError, RequestListEntry, RequestQuery,
    StatusBasis, StatusTally,
};
use serde::Serialize;
use tracing::info;

use crate::context::RequestContext;
use crate::source::ApprovalSource;

/// A filtered request listing with tallies over the unfiltered set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestBoard {
    pub wing_name: Option<String>,
    pub requests: Vec<RequestListEntry>,
    pub tally: StatusTally,
    pub reported_total: Option<usize>,
}

impl RequestBoard {
    fn build(
        wing_name: Option<String>,
        entries: Vec<RequestListEntry>,
        reported_total: Option<usize>,
        query: &RequestQuery,
        basis: StatusBasis,
    ) -> Self {
        let tally = tally_statuses(&entries, basis);
        let requests = filter_requests(&entries, query, basis);
        Self { wing_name, requests, tally, reported_total }
    }
}

pub async fn load_my_requests<S>(
    source: &S,
    user_id: &str,
    query: &RequestQuery,
    context: &RequestContext,
) -> Result<RequestBoard, FetchError>
where
    S: ApprovalSource + ?Sized,
{
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(FetchError::InvalidInput {
            endpoint: Endpoint::MyRequests,
            message: "a user id is required".to_string(),
        });
    }

    let listing = source.fetch_my_requests(user_id, context).await?;
    let board = RequestBoard::build(None, listing.requests, listing.total, query, StatusBasis::Current);

    info!(
        event_name = "tracker.requests.loaded",
        correlation_id = %context.correlation_id,
        listing = Endpoint::MyRequests.as_str(),
        total = board.tally.total,
        shown = board.requests.len(),
        "request listing loaded"
    );

    Ok(board)
}

pub async fn load_wing_history<S>(
    source: &S,
    query: &RequestQuery,
    context: &RequestContext,
) -> Result<RequestBoard, FetchError>
where
    S: ApprovalSource + ?Sized,
{
    let listing = source.fetch_wing_history(context).await?;
    if !listing.success {
        return Err(FetchError::Rejected {
            endpoint: Endpoint::WingHistory,
            message: listing.error.unwrap_or_else(|| "wing history unavailable".to_string()),
        });
    }

    let board = RequestBoard::build(
        listing.wing_name,
        listing.requests,
        None,
        query,
        StatusBasis::Final,
    );

    info!(
        event_name = "tracker.requests.loaded",
        correlation_id = %context.correlation_id,
        listing = Endpoint::WingHistory.as_str(),
        wing = board.wing_name.as_deref().unwrap_or("-"),
        total = board.tally.total,
        shown = board.requests.len(),
        "request listing loaded"
    );

    Ok(board)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use ims_tracker_core::{
        Endpoint, FetchError, Priority, RequestListEntry, RequestListing, RequestQuery,
        RequestStatus, WingHistoryListing,
    };

    use super::{load_my_requests, load_wing_history};
    use crate::context::RequestContext;
    use crate::memory::InMemoryApprovalSource;

    fn entry(id: &str, title: &str, status: RequestStatus, age_days: i64) -> RequestListEntry {
        RequestListEntry {
            id: id.to_string(),
            request_id: format!("SIR-{id}"),
            request_type: "stock_issuance".to_string(),
            title: title.to_string(),
            description: None,
            requester_name: "Alice".to_string(),
            requester_wing: Some("Logistics".to_string()),
            current_status: status,
            final_status: None,
            current_approver_name: None,
            submitted_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).single().expect("valid date")
                - Duration::days(age_days),
            priority: Priority::High,
            total_items: 2,
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn my_requests_are_filtered_but_tallied_in_full() {
        let source = InMemoryApprovalSource::default();
        source
            .insert_my_requests(
                "u-1",
                RequestListing {
                    requests: vec![
                        entry("1", "Toner", RequestStatus::Pending, 2),
                        entry("2", "Chairs", RequestStatus::Approved, 1),
                        entry("3", "Paper", RequestStatus::Pending, 0),
                    ],
                    total: Some(3),
                },
            )
            .await;

        let query = RequestQuery { status: Some(RequestStatus::Pending), search: None };
        let board = load_my_requests(&source, " u-1 ", &query, &RequestContext::new())
            .await
            .expect("listing loads");

        let ids: Vec<&str> = board.requests.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(board.tally.total, 3);
        assert_eq!(board.tally.count(&RequestStatus::Pending), 2);
        assert_eq!(board.reported_total, Some(3));
    }

    #[tokio::test]
    async fn blank_user_id_is_rejected_before_any_call() {
        let source = InMemoryApprovalSource::default();

        let error = load_my_requests(&source, "  ", &RequestQuery::default(), &RequestContext::new())
            .await
            .expect_err("blank user");

        assert!(matches!(error, FetchError::InvalidInput { endpoint: Endpoint::MyRequests, .. }));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn unsuccessful_wing_history_is_an_error() {
        let source = InMemoryApprovalSource::default();
        source
            .set_wing_history(WingHistoryListing {
                success: false,
                wing_name: None,
                requests: Vec::new(),
                error: Some("user has no wing".to_string()),
            })
            .await;

        let error = load_wing_history(&source, &RequestQuery::default(), &RequestContext::new())
            .await
            .expect_err("backend refused");

        assert_eq!(
            error,
            FetchError::Rejected {
                endpoint: Endpoint::WingHistory,
                message: "user has no wing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn wing_history_keeps_wing_name_and_searches() {
        let source = InMemoryApprovalSource::default();
        source
            .set_wing_history(WingHistoryListing {
                success: true,
                wing_name: Some("Logistics".to_string()),
                requests: vec![
                    entry("1", "Printer toner", RequestStatus::Approved, 1),
                    entry("2", "Office chairs", RequestStatus::Rejected, 0),
                ],
                error: None,
            })
            .await;

        let query = RequestQuery { status: None, search: Some("TONER".to_string()) };
        let board = load_wing_history(&source, &query, &RequestContext::new())
            .await
            .expect("wing history loads");

        assert_eq!(board.wing_name.as_deref(), Some("Logistics"));
        assert_eq!(board.requests.len(), 1);
        assert_eq!(board.tally.total, 2);
    }

    #[tokio::test]
    async fn wing_history_filters_on_final_status() {
        let mut decided = entry("1", "Printer toner", RequestStatus::InProgress, 1);
        decided.final_status = Some(RequestStatus::Approved);
        let source = InMemoryApprovalSource::default();
        source
            .set_wing_history(WingHistoryListing {
                success: true,
                wing_name: Some("Logistics".to_string()),
                requests: vec![decided, entry("2", "Office chairs", RequestStatus::InProgress, 0)],
                error: None,
            })
            .await;

        let query = RequestQuery { status: Some(RequestStatus::Approved), search: None };
        let board = load_wing_history(&source, &query, &RequestContext::new())
            .await
            .expect("wing history loads");

        let ids: Vec<&str> = board.requests.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        assert_eq!(board.tally.count(&RequestStatus::Approved), 1);
        assert_eq!(board.tally.count(&RequestStatus::InProgress), 1);
    }
}
