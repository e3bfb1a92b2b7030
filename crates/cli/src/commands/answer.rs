use applypilot_core::config::{AppConfig, LoadOptions};
use applypilot_core::{
    ApplicationQuestion, JobContext, QuestionKind, QuestionResolver, Resolution,
};
use serde::Serialize;

use super::{serialize_payload, CommandResult};

#[derive(Debug, Clone)]
pub struct AnswerArgs {
    pub prompt: String,
    pub kind: String,
    pub choices: String,
    pub title: String,
    pub company: String,
}

#[derive(Debug, Serialize)]
struct AnswerPayload {
    command: String,
    status: String,
    prompt: String,
    kind: String,
    values: Vec<String>,
    provenance: Option<String>,
    reason: Option<String>,
}

/// Resolves one question offline: defaults, sensitivity classification, and
/// bounded heuristics only. A generative backend needs a transport, which
/// only the orchestrator wires in.
pub fn run(load: LoadOptions, args: AnswerArgs, json: bool) -> CommandResult {
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("answer", "config_validation", error.to_string(), 2)
        }
    };

    let Some(kind) = parse_kind(&args.kind) else {
        return CommandResult::failure(
            "answer",
            "invalid_argument",
            format!(
                "unsupported question kind `{}` (expected free_text|single_choice|multi_choice|boolean)",
                args.kind
            ),
            2,
        );
    };

    let choices: Vec<String> = args
        .choices
        .split('|')
        .map(|choice| choice.trim().to_string())
        .filter(|choice| !choice.is_empty())
        .collect();

    let question = ApplicationQuestion::new(&args.prompt, kind).with_choices(choices);
    let job = JobContext { title: args.title.clone(), company: args.company.clone() };
    let resolver = QuestionResolver::from_config(&config.qa);

    match resolver.resolve(&question, &job, None) {
        Resolution::Answered(answer) => {
            if json {
                let payload = AnswerPayload {
                    command: "answer".to_string(),
                    status: "ok".to_string(),
                    prompt: answer.prompt.clone(),
                    kind: args.kind.clone(),
                    values: answer.values.clone(),
                    provenance: Some(answer.provenance.as_str().to_string()),
                    reason: None,
                };
                CommandResult::ok(serialize_payload(&payload))
            } else {
                CommandResult::ok(answer.values.join(", "))
            }
        }
        Resolution::Escalated(escalation) => {
            if json {
                let payload = AnswerPayload {
                    command: "answer".to_string(),
                    status: "escalated".to_string(),
                    prompt: escalation.prompt.clone(),
                    kind: args.kind.clone(),
                    values: Vec::new(),
                    provenance: None,
                    reason: Some(escalation.reason.clone()),
                };
                CommandResult::ok(serialize_payload(&payload))
            } else {
                CommandResult::ok(format!("ESCALATED: {}", escalation.reason))
            }
        }
    }
}

fn parse_kind(raw: &str) -> Option<QuestionKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "free_text" | "text" | "textarea" => Some(QuestionKind::FreeText),
        "single_choice" | "select" | "radio" => Some(QuestionKind::SingleChoice),
        "multi_choice" | "checkbox" => Some(QuestionKind::MultiChoice),
        "boolean" | "bool" => Some(QuestionKind::Boolean),
        _ => None,
    }
}
