use serde::Serialize;

use crate::config::ApplicationConfig;

/// Outcome of the submit gate. `reason` is a stable string recorded in the
/// ledger and surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitDecision {
    pub proceed: bool,
    pub reason: &'static str,
}

/// The safety gate governing submit-vs-stop. A pure function of
/// `(dry_run, auto_submit, required_fields_answered)`; it never consults
/// network or UI state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitPolicy {
    pub dry_run: bool,
    pub auto_submit: bool,
}

impl SubmitPolicy {
    pub fn new(dry_run: bool, auto_submit: bool) -> Self {
        Self { dry_run, auto_submit }
    }

    pub fn from_config(config: &ApplicationConfig) -> Self {
        Self { dry_run: config.dry_run, auto_submit: config.auto_submit }
    }

    pub fn decide(&self, required_fields_answered: bool) -> SubmitDecision {
        if self.dry_run {
            return SubmitDecision { proceed: false, reason: "dry_run" };
        }
        if !self.auto_submit {
            return SubmitDecision { proceed: false, reason: "auto_submit disabled" };
        }
        if !required_fields_answered {
            return SubmitDecision { proceed: false, reason: "incomplete required fields" };
        }
        SubmitDecision { proceed: true, reason: "all submission gates passed" }
    }
}
