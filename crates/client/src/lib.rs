//! Async access to the approval backend and the timeline view built on it.

pub mod board;
pub mod context;
pub mod http;
pub mod memory;
pub mod retry;
pub mod source;
pub mod tracker;
pub mod view;

pub use board::{load_my_requests, load_wing_history, RequestBoard};
pub use context::RequestContext;
pub use http::{HttpApprovalSource, HttpSourceError, HttpSourceSettings, CORRELATION_HEADER};
pub use memory::InMemoryApprovalSource;
pub use retry::RetryPolicy;
pub use source::ApprovalSource;
pub use tracker::TimelineTracker;
pub use view::{LoadOutcome, TimelineView, ViewState};
