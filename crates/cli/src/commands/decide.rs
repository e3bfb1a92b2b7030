use applypilot_core::config::{AppConfig, LoadOptions};
use applypilot_core::SubmitPolicy;
use serde::Serialize;

use super::{serialize_payload, CommandResult};

#[derive(Debug, Serialize)]
struct DecidePayload {
    command: String,
    status: String,
    dry_run: bool,
    auto_submit: bool,
    required_fields_answered: bool,
    proceed: bool,
    reason: String,
}

pub fn run(load: LoadOptions, all_required_answered: bool, json: bool) -> CommandResult {
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("decide", "config_validation", error.to_string(), 2)
        }
    };

    let policy = SubmitPolicy::from_config(&config.application);
    let decision = policy.decide(all_required_answered);

    if json {
        let payload = DecidePayload {
            command: "decide".to_string(),
            status: "ok".to_string(),
            dry_run: policy.dry_run,
            auto_submit: policy.auto_submit,
            required_fields_answered: all_required_answered,
            proceed: decision.proceed,
            reason: decision.reason.to_string(),
        };
        CommandResult::ok(serialize_payload(&payload))
    } else if decision.proceed {
        CommandResult::ok("proceed to submit")
    } else {
        CommandResult::ok(format!("stop before submit: {}", decision.reason))
    }
}
