use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approval::RequestStatus;
use crate::time;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Medium,
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_string()
    }
}

/// A requested line item. Quantities are whole units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub requested_quantity: u32,
    #[serde(default)]
    pub approved_quantity: Option<u32>,
    #[serde(default)]
    pub unit: String,
}

/// One row of the my-requests or wing-history listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestListEntry {
    pub id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub requester_wing: Option<String>,
    pub current_status: RequestStatus,
    /// Outcome as seen from the wing; wing history filters on this.
    #[serde(default)]
    pub final_status: Option<RequestStatus>,
    #[serde(default)]
    pub current_approver_name: Option<String>,
    #[serde(rename = "submitted_date", alias = "submitted_at", with = "time::flexible")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub items: Vec<RequestItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestListing {
    pub requests: Vec<RequestListEntry>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WingHistoryListing {
    pub success: bool,
    #[serde(default)]
    pub wing_name: Option<String>,
    #[serde(default)]
    pub requests: Vec<RequestListEntry>,
    #[serde(default)]
    pub error: Option<String>,
}
