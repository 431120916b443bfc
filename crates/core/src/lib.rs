pub mod config;
pub mod domain;
pub mod errors;
pub mod requests;
pub mod time;
pub mod timeline;

pub use domain::approval::{
    ActionType, ApprovalId, ApprovalStep, ApprovalStepRecord, ForwardRoute, RequestStatus,
    RequestSummary,
};
pub use domain::request::{
    Priority, RequestItem, RequestListEntry, RequestListing, WingHistoryListing,
};
pub use errors::{Endpoint, ErrorBanner, FetchError, LoadError};
pub use requests::{filter_requests, tally_statuses, RequestQuery, StatusBasis, StatusTally};
pub use timeline::{
    derive_display_state, order_for_display, validate_workflow_shape, ActionCounts,
    ConsistencyWarning, DisplayOrder, DisplayState, Timeline, WorkflowPhase,
};
