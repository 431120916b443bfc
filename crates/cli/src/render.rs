//! Plain-text rendering for terminal output.

use chrono::{DateTime, Utc};
use ims_tracker_client::RequestBoard;
use ims_tracker_core::{ApprovalStep, Timeline};

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}

pub fn timeline(timeline: &Timeline) -> String {
    let summary = &timeline.summary;
    let counts = &timeline.display.counts;

    let mut lines = vec![
        format!(
            "{} ({})",
            or_placeholder(&summary.request_id, timeline.approval_id.as_str()),
            or_placeholder(&summary.request_type, "unknown type")
        ),
        format!("workflow: {}", or_placeholder(&summary.workflow_name, "-")),
        format!(
            "status: {} | phase: {} | current approver: {}",
            summary.current_status,
            timeline.phase.as_str(),
            summary.current_approver_label()
        ),
        format!(
            "submitted by {} on {}",
            or_placeholder(&summary.submitted_by_name, "unknown"),
            stamp(summary.submitted_at)
        ),
        format!(
            "actions: {} total | {} forwarded | {} approved | {} rejected",
            counts.total, counts.forwards, counts.approvals, counts.rejections
        ),
    ];

    if counts.total == 0 {
        lines.push("no approval actions recorded yet".to_string());
    }

    for step in &timeline.steps {
        push_step(&mut lines, timeline, step);
    }

    if !timeline.excluded.is_empty() {
        lines.push("steps with unreadable timestamps:".to_string());
        for step in &timeline.excluded {
            push_step(&mut lines, timeline, step);
        }
    }

    if !timeline.warnings.is_empty() {
        lines.push("warnings:".to_string());
        for warning in &timeline.warnings {
            lines.push(format!("  ! {}: {}", warning.code(), warning.describe()));
        }
    }

    lines.join("\n")
}

fn push_step(lines: &mut Vec<String>, timeline: &Timeline, step: &ApprovalStep) {
    let marker = if timeline.is_current(step) { "*" } else { "-" };
    let at = step.occurred_at.map(stamp).unwrap_or_else(|| step.raw_occurred_at.clone());

    let action = match step.forward_route() {
        Some(route) => format!(
            "forwarded {} -> {}",
            route.from_label,
            route.to_label.unwrap_or("unknown recipient")
        ),
        None => format!("{} by {}", step.action_type, or_placeholder(&step.actor_name, "unknown")),
    };

    let current = if marker == "*" { " (current)" } else { "" };
    lines.push(format!("{marker} #{} {at} {action}{current}", step.step_number));
    if let Some(comments) = step.comments() {
        lines.push(format!("    \"{comments}\""));
    }
}

pub fn board(title: &str, board: &RequestBoard) -> String {
    let heading = match board.wing_name.as_deref() {
        Some(wing) => format!("{title} ({wing})"),
        None => title.to_string(),
    };

    let mut lines =
        vec![format!("{heading}: showing {} of {}", board.requests.len(), board.tally.total)];

    if !board.tally.by_status.is_empty() {
        let tally: Vec<String> = board
            .tally
            .by_status
            .iter()
            .map(|(status, count)| format!("{status} {count}"))
            .collect();
        lines.push(tally.join(" | "));
    }

    for entry in &board.requests {
        let approver = entry
            .current_approver_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("unassigned");
        lines.push(format!(
            "- {} [{}] {} | {} | {} priority | submitted {} | approver: {}",
            or_placeholder(&entry.request_id, &entry.id),
            entry.current_status,
            or_placeholder(&entry.title, "untitled"),
            or_placeholder(&entry.requester_name, "unknown"),
            entry.priority.as_str(),
            stamp(entry.submitted_at),
            approver,
        ));
    }

    lines.join("\n")
}
