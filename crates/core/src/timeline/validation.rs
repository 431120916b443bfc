use serde::{Deserialize, Serialize};

use crate::domain::approval::{ActionType, ApprovalStep, RequestStatus, RequestSummary};

/// Structurally valid but semantically anomalous data. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    MultipleCurrentSteps { step_numbers: Vec<u32>, surfaced: u32 },
    MissingCurrentStep { last_step: u32 },
    CurrentStepOnTerminal { step_number: u32, terminal_step: u32 },
    UnparseableTimestamp { step_number: u32, raw: String },
    UnknownActionType { step_number: u32, action_type: String },
    NonSequentialSteps { expected: u32, found: u32 },
    UnexpectedFirstStep { step_number: u32, action_type: ActionType },
    UnexpectedTransition { step_number: u32, previous: ActionType, next: ActionType },
    StepAfterTerminal { terminal_step: u32, step_number: u32 },
    MissingForwardTarget { step_number: u32 },
    SummaryStatusMismatch { summary_status: RequestStatus, phase: WorkflowPhase },
    MissingCurrentApprover { status: RequestStatus },
    CurrentApproverMismatch { summary_approver: String, step_actor: String },
}

impl ConsistencyWarning {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MultipleCurrentSteps { .. } => "multiple_current_steps",
            Self::MissingCurrentStep { .. } => "missing_current_step",
            Self::CurrentStepOnTerminal { .. } => "current_step_on_terminal",
            Self::UnparseableTimestamp { .. } => "unparseable_timestamp",
            Self::UnknownActionType { .. } => "unknown_action_type",
            Self::NonSequentialSteps { .. } => "non_sequential_steps",
            Self::UnexpectedFirstStep { .. } => "unexpected_first_step",
            Self::UnexpectedTransition { .. } => "unexpected_transition",
            Self::StepAfterTerminal { .. } => "step_after_terminal",
            Self::MissingForwardTarget { .. } => "missing_forward_target",
            Self::SummaryStatusMismatch { .. } => "summary_status_mismatch",
            Self::MissingCurrentApprover { .. } => "missing_current_approver",
            Self::CurrentApproverMismatch { .. } => "current_approver_mismatch",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::MultipleCurrentSteps { step_numbers, surfaced } => {
                format!("steps {step_numbers:?} all claim to be current; surfacing step {surfaced}")
            }
            Self::MissingCurrentStep { last_step } => {
                format!("workflow is still open after step {last_step} but no step is flagged current")
            }
            Self::CurrentStepOnTerminal { step_number, terminal_step } => {
                format!(
                    "step {step_number} is flagged current but the workflow ended at step {terminal_step}"
                )
            }
            Self::UnparseableTimestamp { step_number, raw } => {
                format!("step {step_number} has unparseable timestamp `{raw}`")
            }
            Self::UnknownActionType { step_number, action_type } => {
                format!("step {step_number} has unknown action type `{action_type}`")
            }
            Self::NonSequentialSteps { expected, found } => {
                format!("expected step number {expected} but found {found}")
            }
            Self::UnexpectedFirstStep { step_number, action_type } => {
                format!("workflow starts with `{action_type}` at step {step_number} instead of `submitted`")
            }
            Self::UnexpectedTransition { step_number, previous, next } => {
                format!("step {step_number} moves from `{previous}` to `{next}`")
            }
            Self::StepAfterTerminal { terminal_step, step_number } => {
                format!("step {step_number} follows terminal step {terminal_step}")
            }
            Self::MissingForwardTarget { step_number } => {
                format!("forwarding step {step_number} has no target approver")
            }
            Self::SummaryStatusMismatch { summary_status, phase } => {
                format!(
                    "summary status `{summary_status}` disagrees with history phase `{}`",
                    phase.as_str()
                )
            }
            Self::MissingCurrentApprover { status } => {
                format!("request is `{status}` but has no current approver")
            }
            Self::CurrentApproverMismatch { summary_approver, step_actor } => {
                format!(
                    "summary names `{summary_approver}` as current approver but the current step belongs to `{step_actor}`"
                )
            }
        }
    }
}

/// Where the request sits in `Submitted -> Forwarded* -> (Approved | Rejected) -> [Finalized]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    NoHistory,
    Submitted,
    InReview,
    Approved,
    Rejected,
    Finalized,
}

impl WorkflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoHistory => "no_history",
            Self::Submitted => "submitted",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Finalized => "finalized",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }

    pub fn of(steps: &[ApprovalStep]) -> Self {
        let last = by_step_number(steps)
            .into_iter()
            .rev()
            .find(|step| !matches!(step.action_type, ActionType::Other(_)));

        match last.map(|step| &step.action_type) {
            None => Self::NoHistory,
            Some(ActionType::Submitted) => Self::Submitted,
            Some(ActionType::Forwarded) => Self::InReview,
            Some(ActionType::Approved) => Self::Approved,
            Some(ActionType::Rejected) => Self::Rejected,
            Some(ActionType::Finalized) => Self::Finalized,
            Some(ActionType::Other(_)) => Self::NoHistory,
        }
    }

    fn agrees_with(self, status: &RequestStatus) -> bool {
        match status {
            RequestStatus::Rejected => self == Self::Rejected,
            RequestStatus::Finalized => self == Self::Finalized,
            RequestStatus::Approved => self == Self::Approved,
            RequestStatus::Pending
            | RequestStatus::Submitted
            | RequestStatus::InProgress
            | RequestStatus::Returned => !self.is_terminal(),
            RequestStatus::Other(_) => true,
        }
    }
}

/// Checks the history against the workflow state machine and the summary.
/// Current-step flags are checked by `derive_display_state`.
pub fn validate_workflow_shape(
    steps: &[ApprovalStep],
    summary: &RequestSummary,
) -> Vec<ConsistencyWarning> {
    let ordered = by_step_number(steps);
    let mut warnings = Vec::new();

    for (expected, step) in (1u32..).zip(ordered.iter()) {
        if step.step_number != expected {
            warnings.push(ConsistencyWarning::NonSequentialSteps {
                expected,
                found: step.step_number,
            });
            break;
        }
    }

    let mut previous: Option<&ApprovalStep> = None;
    let mut terminal: Option<u32> = None;

    for step in &ordered {
        if let ActionType::Other(action_type) = &step.action_type {
            warnings.push(ConsistencyWarning::UnknownActionType {
                step_number: step.step_number,
                action_type: action_type.clone(),
            });
            continue;
        }

        if step.action_type == ActionType::Forwarded
            && step.forward_route().and_then(|route| route.to_label).is_none()
        {
            warnings.push(ConsistencyWarning::MissingForwardTarget { step_number: step.step_number });
        }

        if let Some(terminal_step) = terminal {
            warnings.push(ConsistencyWarning::StepAfterTerminal {
                terminal_step,
                step_number: step.step_number,
            });
            continue;
        }

        match previous {
            None if step.action_type != ActionType::Submitted => {
                warnings.push(ConsistencyWarning::UnexpectedFirstStep {
                    step_number: step.step_number,
                    action_type: step.action_type.clone(),
                });
            }
            Some(prev) if !transition_allowed(&prev.action_type, &step.action_type) => {
                warnings.push(ConsistencyWarning::UnexpectedTransition {
                    step_number: step.step_number,
                    previous: prev.action_type.clone(),
                    next: step.action_type.clone(),
                });
            }
            _ => {}
        }

        if step.action_type.is_terminal() {
            terminal = Some(step.step_number);
        }
        previous = Some(step);
    }

    let phase = WorkflowPhase::of(steps);
    if !phase.agrees_with(&summary.current_status) {
        warnings.push(ConsistencyWarning::SummaryStatusMismatch {
            summary_status: summary.current_status.clone(),
            phase,
        });
    }

    if summary.current_status.awaits_approver() {
        match summary.current_approver() {
            None => warnings.push(ConsistencyWarning::MissingCurrentApprover {
                status: summary.current_status.clone(),
            }),
            Some(approver) => {
                let expected = steps.iter().find(|step| step.is_current_step).and_then(pending_actor);
                if let Some(step_actor) = expected {
                    if !step_actor.eq_ignore_ascii_case(approver) {
                        warnings.push(ConsistencyWarning::CurrentApproverMismatch {
                            summary_approver: approver.to_string(),
                            step_actor: step_actor.to_string(),
                        });
                    }
                }
            }
        }
    }

    warnings
}

fn transition_allowed(previous: &ActionType, next: &ActionType) -> bool {
    use ActionType::*;

    matches!(
        (previous, next),
        (Submitted | Forwarded, Forwarded | Approved | Rejected) | (Approved, Finalized)
    )
}

/// A forwarded step waits on its target; any other step on its actor.
fn pending_actor(step: &ApprovalStep) -> Option<&str> {
    let actor = match step.forward_route() {
        Some(route) => route.to_label,
        None => Some(step.actor_name.as_str()),
    };
    actor.map(str::trim).filter(|actor| !actor.is_empty())
}

pub(crate) fn by_step_number(steps: &[ApprovalStep]) -> Vec<&ApprovalStep> {
    let mut ordered: Vec<&ApprovalStep> = steps.iter().collect();
    ordered.sort_by_key(|step| step.step_number);
    ordered
}
