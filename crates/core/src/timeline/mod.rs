//! Display derivation for a request's approval history.
//!
//! The backend's ordering and `is_current_step` flags are not trusted: the
//! timeline is re-sorted by timestamp value, current-step claims are checked,
//! and every anomaly becomes a [`ConsistencyWarning`] instead of an error.

pub mod validation;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::approval::{
    ActionType, ApprovalId, ApprovalStep, ApprovalStepRecord, RequestSummary,
};

pub use validation::{validate_workflow_shape, ConsistencyWarning, WorkflowPhase};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub forwards: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub counts: ActionCounts,
    pub current_step_id: Option<u32>,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Steps split into the sortable timeline and the ones whose timestamp could
/// not be parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayOrder {
    pub steps: Vec<ApprovalStep>,
    pub excluded: Vec<ApprovalStep>,
    pub warnings: Vec<ConsistencyWarning>,
}

pub fn derive_display_state(steps: &[ApprovalStep]) -> DisplayState {
    let mut counts = ActionCounts { total: steps.len(), ..ActionCounts::default() };
    for step in steps {
        match step.action_type {
            ActionType::Forwarded => counts.forwards += 1,
            ActionType::Approved => counts.approvals += 1,
            ActionType::Rejected => counts.rejections += 1,
            _ => {}
        }
    }

    let claims: Vec<u32> =
        steps.iter().filter(|step| step.is_current_step).map(|step| step.step_number).collect();
    let mut warnings = Vec::new();

    let Some(&first_claim) = claims.first() else {
        if let Some(last_step) = open_past_submission(steps) {
            warnings.push(ConsistencyWarning::MissingCurrentStep { last_step });
        }
        return DisplayState { counts, current_step_id: None, warnings };
    };

    if claims.len() > 1 {
        warnings.push(ConsistencyWarning::MultipleCurrentSteps {
            step_numbers: claims.clone(),
            surfaced: first_claim,
        });
    }

    // A rejected or finalized workflow has no pending action point.
    let terminal_step = validation::by_step_number(steps)
        .into_iter()
        .find(|step| step.action_type.is_terminal())
        .map(|step| step.step_number);

    if let Some(terminal_step) = terminal_step {
        for &step_number in &claims {
            warnings.push(ConsistencyWarning::CurrentStepOnTerminal { step_number, terminal_step });
        }
        return DisplayState { counts, current_step_id: None, warnings };
    }

    DisplayState { counts, current_step_id: Some(first_claim), warnings }
}

/// The highest step number of a history that has moved past submission
/// without reaching a terminal step. A lone submission awaits its first
/// decision and needs no current step.
fn open_past_submission(steps: &[ApprovalStep]) -> Option<u32> {
    let progressed = steps.iter().any(|step| {
        matches!(step.action_type, ActionType::Forwarded | ActionType::Approved)
    });
    let terminal = steps.iter().any(|step| step.action_type.is_terminal());

    (progressed && !terminal).then(|| steps.iter().map(|step| step.step_number).max()).flatten()
}

/// Most recent first. The sort is stable and keyed on the parsed timestamp,
/// so equal timestamps keep the order the backend sent.
pub fn order_for_display(steps: Vec<ApprovalStep>) -> DisplayOrder {
    let (mut sortable, excluded): (Vec<_>, Vec<_>) =
        steps.into_iter().partition(|step| step.occurred_at.is_some());

    sortable.sort_by(|left, right| right.occurred_at.cmp(&left.occurred_at));

    let warnings = excluded
        .iter()
        .map(|step| ConsistencyWarning::UnparseableTimestamp {
            step_number: step.step_number,
            raw: step.raw_occurred_at.clone(),
        })
        .collect();

    DisplayOrder { steps: sortable, excluded, warnings }
}

/// An immutable snapshot of one request's summary and history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub approval_id: ApprovalId,
    pub summary: RequestSummary,
    pub steps: Vec<ApprovalStep>,
    pub excluded: Vec<ApprovalStep>,
    pub display: DisplayState,
    pub phase: WorkflowPhase,
    pub warnings: Vec<ConsistencyWarning>,
    pub last_action_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
}

impl Timeline {
    pub fn assemble(
        approval_id: ApprovalId,
        summary: RequestSummary,
        records: Vec<ApprovalStepRecord>,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        let steps: Vec<ApprovalStep> = records.into_iter().map(ApprovalStep::from).collect();

        let display = derive_display_state(&steps);
        let phase = WorkflowPhase::of(&steps);
        let mut warnings = display.warnings.clone();
        warnings.extend(validate_workflow_shape(&steps, &summary));

        let order = order_for_display(steps);
        warnings.extend(order.warnings);
        let last_action_at = order.steps.first().and_then(|step| step.occurred_at);

        Self {
            approval_id,
            summary,
            steps: order.steps,
            excluded: order.excluded,
            display,
            phase,
            warnings,
            last_action_at,
            loaded_at,
        }
    }

    pub fn current_step(&self) -> Option<&ApprovalStep> {
        let current = self.display.current_step_id?;
        self.steps
            .iter()
            .chain(self.excluded.iter())
            .find(|step| step.step_number == current && step.is_current_step)
    }

    pub fn is_current(&self, step: &ApprovalStep) -> bool {
        self.display.current_step_id == Some(step.step_number) && step.is_current_step
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
