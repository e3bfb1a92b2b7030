use std::fs;

use applypilot_core::config::{AppConfig, GenerationProvider, LoadOptions};
use applypilot_core::ledger::JsonlLedger;
use applypilot_core::tailor::TailorEngine;
use serde::Serialize;

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(load: LoadOptions, json_output: bool) -> String {
    let report = build_report(load);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(load: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(load) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_base_resume(&config));
            checks.push(check_resume_template(&config));
            checks.push(check_qa_defaults(&config));
            checks.push(check_generation_readiness(&config));
            checks.push(check_ledger_append(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [
                "base_resume",
                "resume_template",
                "qa_defaults",
                "generation_readiness",
                "ledger_append",
            ] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_ok =
        checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_ok { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_ok {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_base_resume(config: &AppConfig) -> DoctorCheck {
    let path = &config.resume.base_resume_path;
    match fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => DoctorCheck {
            name: "base_resume",
            status: CheckStatus::Pass,
            details: format!("`{}` readable, {} bytes", path.display(), content.len()),
        },
        Ok(_) => DoctorCheck {
            name: "base_resume",
            status: CheckStatus::Fail,
            details: format!("`{}` is empty", path.display()),
        },
        Err(error) => DoctorCheck {
            name: "base_resume",
            status: CheckStatus::Fail,
            details: format!("could not read `{}`: {error}", path.display()),
        },
    }
}

fn check_resume_template(config: &AppConfig) -> DoctorCheck {
    match TailorEngine::from_config(&config.resume, &config.qa) {
        Ok(_) => DoctorCheck {
            name: "resume_template",
            status: CheckStatus::Pass,
            details: format!("`{}` parsed", config.resume.template_path.display()),
        },
        Err(error) => DoctorCheck {
            name: "resume_template",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_qa_defaults(config: &AppConfig) -> DoctorCheck {
    let count = config.qa.defaults.len();
    let details = if count == 0 {
        "no qa defaults configured; unmatched prompts will escalate more often".to_string()
    } else {
        format!("{count} defaults, {} alias rules", config.qa.aliases.len())
    };
    DoctorCheck { name: "qa_defaults", status: CheckStatus::Pass, details }
}

fn check_generation_readiness(config: &AppConfig) -> DoctorCheck {
    if !config.generation.enabled {
        return DoctorCheck {
            name: "generation_readiness",
            status: CheckStatus::Skipped,
            details: "generation disabled; resolver uses defaults and escalation only"
                .to_string(),
        };
    }

    if config.generation.is_ready() {
        DoctorCheck {
            name: "generation_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "provider {:?} configured with model `{}`",
                config.generation.provider, config.generation.model
            ),
        }
    } else {
        let hint = match config.generation.provider {
            GenerationProvider::OpenAi | GenerationProvider::Anthropic => {
                "set generation.api_key or APPLYPILOT_GENERATION_API_KEY"
            }
            GenerationProvider::Ollama => "set generation.provider options",
        };
        DoctorCheck {
            name: "generation_readiness",
            status: CheckStatus::Fail,
            details: format!("generation enabled but not ready ({hint})"),
        }
    }
}

fn check_ledger_append(config: &AppConfig) -> DoctorCheck {
    match JsonlLedger::open(&config.application.ledger_path) {
        Ok(ledger) => DoctorCheck {
            name: "ledger_append",
            status: CheckStatus::Pass,
            details: format!("`{}` open for append", ledger.path().display()),
        },
        Err(error) => DoctorCheck {
            name: "ledger_append",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
