use ims_tracker_client::{HttpApprovalSource, RequestContext};
use ims_tracker_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_OK};

pub const EXIT_DOCTOR_FAILED: u8 = 7;

const COMMAND: &str = "doctor";
const CONFIG_CHECK: &str = "config_validation";
const CLIENT_CHECK: &str = "api_client";
const BACKEND_CHECK: &str = "backend_reachability";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl ToString) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.to_string() }
    }

    fn skip(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped: {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: &'static str,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let healthy = checks.iter().all(|check| check.status == CheckStatus::Pass);
        let (overall_status, summary) = if healthy {
            (CheckStatus::Pass, "tracker is ready to reach the approval service")
        } else {
            (CheckStatus::Fail, "tracker is not ready; see failing checks")
        };
        Self { overall_status, summary, checks }
    }

    fn to_text(&self) -> String {
        let mut out = format!("doctor: {}", self.summary);
        for check in &self.checks {
            let marker = match check.status {
                CheckStatus::Pass => "ok",
                CheckStatus::Fail => "fail",
                CheckStatus::Skipped => "skip",
            };
            out.push_str(&format!("\n- [{marker}] {}: {}", check.name, check.details));
        }
        out
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = DoctorReport::from_checks(run_checks());
    let exit_code =
        if report.overall_status == CheckStatus::Pass { EXIT_OK } else { EXIT_DOCTOR_FAILED };

    if !json_output {
        return CommandResult { exit_code, output: report.to_text() };
    }

    match serde_json::to_string_pretty(&report) {
        Ok(output) => CommandResult { exit_code, output },
        Err(error) => {
            CommandResult::failure(COMMAND, "serialization", error.to_string(), EXIT_DOCTOR_FAILED)
        }
    }
}

/// Config, then client, then backend; a failing stage skips everything after it.
fn run_checks() -> Vec<DoctorCheck> {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return vec![
                DoctorCheck::fail(CONFIG_CHECK, error),
                DoctorCheck::skip(CLIENT_CHECK, "configuration did not load"),
                DoctorCheck::skip(BACKEND_CHECK, "configuration did not load"),
            ];
        }
    };
    let mut checks = vec![DoctorCheck::pass(CONFIG_CHECK, "configuration loaded and validated")];

    let source = match HttpApprovalSource::from_config(&config.api) {
        Ok(source) => source,
        Err(error) => {
            checks.push(DoctorCheck::fail(CLIENT_CHECK, error));
            checks.push(DoctorCheck::skip(BACKEND_CHECK, "api client could not be built"));
            return checks;
        }
    };
    checks.push(DoctorCheck::pass(
        CLIENT_CHECK,
        format!(
            "client ready for `{}` ({}s timeout, {} retry)",
            source.base_url(),
            config.api.timeout_secs,
            config.api.max_retries
        ),
    ));

    checks.push(probe_backend(&source));
    checks
}

fn probe_backend(source: &HttpApprovalSource) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(BACKEND_CHECK, format!("async runtime unavailable: {error}"))
        }
    };

    match runtime.block_on(source.probe(&RequestContext::new())) {
        Ok(status) => DoctorCheck::pass(
            BACKEND_CHECK,
            format!("`{}` answered with HTTP {status}", source.base_url()),
        ),
        Err(error) => DoctorCheck::fail(BACKEND_CHECK, error),
    }
}
