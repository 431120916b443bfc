use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::time::{self, parse_timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    /// Returns `None` for blank input so callers never issue a request for an empty id.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Submitted,
    Forwarded,
    Approved,
    Rejected,
    Finalized,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "submitted",
            Self::Forwarded => "forwarded",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Finalized => "finalized",
            Self::Other(value) => value,
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Self::Submitted,
            "forwarded" => Self::Forwarded,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "finalized" => Self::Finalized,
            _ => Self::Other(value),
        }
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Pending,
    Submitted,
    InProgress,
    Returned,
    Approved,
    Rejected,
    Finalized,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::InProgress => "in_progress",
            Self::Returned => "returned",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Finalized => "finalized",
            Self::Other(value) => value,
        }
    }

    /// Rejected and finalized requests have no pending action point.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }

    pub fn awaits_approver(&self) -> bool {
        matches!(self, Self::Pending | Self::Submitted | Self::InProgress)
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Self::Pending,
            "submitted" => Self::Submitted,
            "in_progress" => Self::InProgress,
            "returned" => Self::Returned,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "finalized" => Self::Finalized,
            _ => Self::Other(value),
        }
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value.to_string()))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A history row as the backend sends it. The timestamp stays raw until
/// conversion so one bad row cannot fail the whole history decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStepRecord {
    pub step_number: u32,
    pub action_type: ActionType,
    #[serde(rename = "action_by", alias = "actor_id", default, deserialize_with = "deserialize_text")]
    pub actor_id: String,
    #[serde(
        rename = "action_by_name",
        alias = "actor_name",
        default,
        deserialize_with = "deserialize_text"
    )]
    pub actor_name: String,
    #[serde(rename = "forwarded_from", alias = "forwarded_from_id", default)]
    pub forwarded_from_id: Option<String>,
    #[serde(default)]
    pub forwarded_from_name: Option<String>,
    #[serde(rename = "forwarded_to", alias = "forwarded_to_id", default)]
    pub forwarded_to_id: Option<String>,
    #[serde(default)]
    pub forwarded_to_name: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(rename = "action_date", alias = "occurred_at", default, deserialize_with = "deserialize_text")]
    pub occurred_at: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_current_step: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalStep {
    pub step_number: u32,
    pub action_type: ActionType,
    pub actor_id: String,
    pub actor_name: String,
    pub forwarded_from_id: Option<String>,
    pub forwarded_from_name: Option<String>,
    pub forwarded_to_id: Option<String>,
    pub forwarded_to_name: Option<String>,
    pub comments: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub raw_occurred_at: String,
    pub is_current_step: bool,
}

/// The from/to pair of a forwarding step, exactly as recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForwardRoute<'a> {
    pub from_id: Option<&'a str>,
    pub from_label: &'a str,
    pub to_id: Option<&'a str>,
    pub to_label: Option<&'a str>,
}

impl ApprovalStep {
    pub fn forward_route(&self) -> Option<ForwardRoute<'_>> {
        if self.action_type != ActionType::Forwarded {
            return None;
        }

        let from_label = non_blank(self.forwarded_from_name.as_deref())
            .or_else(|| non_blank(self.forwarded_from_id.as_deref()))
            .unwrap_or("System");
        let to_label = non_blank(self.forwarded_to_name.as_deref())
            .or_else(|| non_blank(self.forwarded_to_id.as_deref()));

        Some(ForwardRoute {
            from_id: non_blank(self.forwarded_from_id.as_deref()),
            from_label,
            to_id: non_blank(self.forwarded_to_id.as_deref()),
            to_label,
        })
    }

    pub fn comments(&self) -> Option<&str> {
        non_blank(self.comments.as_deref())
    }
}

impl From<ApprovalStepRecord> for ApprovalStep {
    fn from(record: ApprovalStepRecord) -> Self {
        let occurred_at = parse_timestamp(&record.occurred_at);
        let forwarded = record.action_type == ActionType::Forwarded;

        Self {
            step_number: record.step_number,
            action_type: record.action_type,
            actor_id: record.actor_id,
            actor_name: record.actor_name,
            forwarded_from_id: record.forwarded_from_id.filter(|_| forwarded),
            forwarded_from_name: record.forwarded_from_name.filter(|_| forwarded),
            forwarded_to_id: record.forwarded_to_id.filter(|_| forwarded),
            forwarded_to_name: record.forwarded_to_name.filter(|_| forwarded),
            comments: record.comments,
            occurred_at,
            raw_occurred_at: record.occurred_at,
            is_current_step: record.is_current_step,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub request_id: String,
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub workflow_name: String,
    pub current_status: RequestStatus,
    #[serde(default)]
    pub submitted_by_name: String,
    #[serde(default)]
    pub current_approver_name: Option<String>,
    #[serde(rename = "submitted_date", alias = "submitted_at", with = "time::flexible")]
    pub submitted_at: DateTime<Utc>,
}

impl RequestSummary {
    pub fn current_approver(&self) -> Option<&str> {
        non_blank(self.current_approver_name.as_deref())
    }

    /// Display label for the current approver; never invents a role name.
    pub fn current_approver_label(&self) -> &str {
        self.current_approver().unwrap_or("unassigned")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Nullable text columns: `null` becomes empty, numbers keep their literal form.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Int(value)) => value != 0,
        Some(Flag::Text(value)) => matches!(value.trim(), "1" | "true" | "TRUE" | "True"),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ActionType, ApprovalId, ApprovalStep, ApprovalStepRecord, RequestStatus, RequestSummary};

    #[test]
    fn approval_id_rejects_blank_input() {
        assert!(ApprovalId::parse("").is_none());
        assert!(ApprovalId::parse("   ").is_none());
        assert_eq!(ApprovalId::parse(" APR-7 ").map(|id| id.0), Some("APR-7".to_string()));
    }

    #[test]
    fn action_type_is_case_insensitive_and_keeps_unknown_values() {
        assert_eq!(ActionType::from("Forwarded".to_string()), ActionType::Forwarded);
        assert_eq!(ActionType::from(" APPROVED ".to_string()), ActionType::Approved);
        assert_eq!(
            ActionType::from("returned".to_string()),
            ActionType::Other("returned".to_string())
        );
    }

    #[test]
    fn request_status_normalizes_spacing() {
        assert_eq!(RequestStatus::from("In Progress".to_string()), RequestStatus::InProgress);
        assert_eq!(RequestStatus::from("in-progress".to_string()), RequestStatus::InProgress);
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
    }

    #[test]
    fn step_record_decodes_backend_field_names() {
        let record: ApprovalStepRecord = serde_json::from_value(json!({
            "step_number": 2,
            "action_type": "forwarded",
            "action_by": "u-1",
            "action_by_name": "Alice",
            "forwarded_from": "u-1",
            "forwarded_from_name": "Alice",
            "forwarded_to": "u-2",
            "forwarded_to_name": "Bob",
            "comments": "please review",
            "action_date": "2025-01-02T09:00:00Z",
            "is_current_step": 1
        }))
        .expect("record decodes");

        let step = ApprovalStep::from(record);
        assert_eq!(step.actor_name, "Alice");
        assert!(step.is_current_step);
        assert!(step.occurred_at.is_some());

        let route = step.forward_route().expect("forwarded step has a route");
        assert_eq!(route.from_id, Some("u-1"));
        assert_eq!(route.from_label, "Alice");
        assert_eq!(route.to_id, Some("u-2"));
        assert_eq!(route.to_label, Some("Bob"));
    }

    #[test]
    fn forward_fields_are_dropped_for_other_actions() {
        let record: ApprovalStepRecord = serde_json::from_value(json!({
            "step_number": 3,
            "action_type": "approved",
            "action_by_name": "Bob",
            "forwarded_to": "u-9",
            "action_date": "2025-01-02 10:00:00"
        }))
        .expect("record decodes");

        let step = ApprovalStep::from(record);
        assert!(step.forwarded_to_id.is_none());
        assert!(step.forward_route().is_none());
        assert!(!step.is_current_step);
    }

    #[test]
    fn forward_without_origin_is_labelled_system() {
        let record: ApprovalStepRecord = serde_json::from_value(json!({
            "step_number": 2,
            "action_type": "forwarded",
            "forwarded_to_name": "Bob",
            "action_date": "2025-01-02 10:00:00"
        }))
        .expect("record decodes");

        let step = ApprovalStep::from(record);
        let route = step.forward_route().expect("route");
        assert_eq!(route.from_label, "System");
        assert_eq!(route.to_label, Some("Bob"));
    }

    #[test]
    fn malformed_timestamp_is_kept_raw() {
        let record: ApprovalStepRecord = serde_json::from_value(json!({
            "step_number": 1,
            "action_type": "submitted",
            "action_date": "not-a-date"
        }))
        .expect("record decodes");

        let step = ApprovalStep::from(record);
        assert!(step.occurred_at.is_none());
        assert_eq!(step.raw_occurred_at, "not-a-date");
    }

    #[test]
    fn null_columns_decode_and_leave_the_timestamp_unparsed() {
        let records: Vec<ApprovalStepRecord> = serde_json::from_value(json!([
            {
                "step_number": 1,
                "action_type": "submitted",
                "action_by": "u-1",
                "action_by_name": "Alice",
                "action_date": "2025-01-02 09:00:00"
            },
            {
                "step_number": 2,
                "action_type": "forwarded",
                "action_by": null,
                "action_by_name": null,
                "forwarded_to_name": "Bob",
                "action_date": null
            },
            {
                "step_number": 3,
                "action_type": "approved",
                "action_by_name": "Bob",
                "action_date": 20250102
            }
        ]))
        .expect("history with null columns decodes");

        let steps: Vec<ApprovalStep> = records.into_iter().map(ApprovalStep::from).collect();
        assert!(steps[0].occurred_at.is_some());
        assert_eq!(steps[1].actor_name, "");
        assert!(steps[1].occurred_at.is_none());
        assert_eq!(steps[1].raw_occurred_at, "");
        assert!(steps[2].occurred_at.is_none());
        assert_eq!(steps[2].raw_occurred_at, "20250102");
    }

    #[test]
    fn summary_without_approver_is_unassigned() {
        let summary: RequestSummary = serde_json::from_value(json!({
            "request_id": "REQ-1",
            "request_type": "stock_issuance",
            "workflow_name": "Wing approval",
            "current_status": "pending",
            "submitted_by_name": "Alice",
            "current_approver_name": "  ",
            "submitted_date": "2025-01-01 08:00:00"
        }))
        .expect("summary decodes");

        assert_eq!(summary.current_approver_label(), "unassigned");
        assert_eq!(summary.current_status, RequestStatus::Pending);
    }
}
