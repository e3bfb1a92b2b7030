use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use applypilot_cli::commands::{answer, decide, tailor};
use applypilot_core::config::LoadOptions;
use serde_json::Value;
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const OVERRIDE_VARS: &[&str] = &[
    "APPLYPILOT_DRY_RUN",
    "APPLYPILOT_AUTO_SUBMIT",
    "APPLYPILOT_MAX_APPLICATIONS",
    "APPLYPILOT_LEDGER_PATH",
    "APPLYPILOT_RESUME_BASE_PATH",
    "APPLYPILOT_RESUME_TEMPLATE_PATH",
    "APPLYPILOT_RESUME_OUTPUT_DIR",
    "APPLYPILOT_GENERATION_ENABLED",
    "APPLYPILOT_GENERATION_PROVIDER",
    "APPLYPILOT_GENERATION_API_KEY",
    "APPLYPILOT_GENERATION_MODEL",
    "APPLYPILOT_GENERATION_MAX_RETRIES",
    "APPLYPILOT_LOGGING_LEVEL",
    "APPLYPILOT_LOG_LEVEL",
    "APPLYPILOT_LOGGING_FORMAT",
    "APPLYPILOT_LOG_FORMAT",
];

fn with_clean_env<T>(body: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for var in OVERRIDE_VARS {
        env::remove_var(var);
    }
    body()
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("applypilot.toml");
    fs::write(&path, body).expect("write config file");
    path
}

fn load_for(path: PathBuf) -> LoadOptions {
    LoadOptions { config_path: Some(path), require_file: true, ..LoadOptions::default() }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

#[test]
fn decide_stops_in_dry_run_by_default() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "");

        let result = decide::run(load_for(path), true, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "decide");
        assert_eq!(payload["proceed"], false);
        assert_eq!(payload["reason"], "dry_run");
    });
}

#[test]
fn decide_proceeds_for_live_config_with_answered_fields() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"
[application]
dry_run = false
auto_submit = true
"#,
        );

        let result = decide::run(load_for(path), true, true);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["proceed"], true);
    });
}

#[test]
fn decide_reports_incomplete_fields_on_live_config() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"
[application]
dry_run = false
auto_submit = true
"#,
        );

        let result = decide::run(load_for(path), false, true);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["proceed"], false);
        assert_eq!(payload["reason"], "incomplete required fields");
    });
}

#[test]
fn answer_resolves_configured_default_with_provenance() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"
[qa.defaults]
work_authorization_us = "Yes"

[[qa.aliases]]
key = "work_authorization_us"
patterns = ["authorized to work"]
"#,
        );

        let args = answer::AnswerArgs {
            prompt: "Are you legally authorized to work in the US?".to_string(),
            kind: "single_choice".to_string(),
            choices: "Yes|No".to_string(),
            title: "SWE Intern".to_string(),
            company: "Acme".to_string(),
        };
        let result = answer::run(load_for(path), args, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["values"][0], "Yes");
        assert_eq!(payload["provenance"], "default");
    });
}

#[test]
fn answer_escalates_sensitive_prompt_without_default() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "");

        let args = answer::AnswerArgs {
            prompt: "Will you require visa sponsorship?".to_string(),
            kind: "single_choice".to_string(),
            choices: "Yes|No".to_string(),
            title: "SWE Intern".to_string(),
            company: "Acme".to_string(),
        };
        let result = answer::run(load_for(path), args, true);
        assert_eq!(result.exit_code, 0, "escalation is a control signal, not an error");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "escalated");
        assert!(payload["reason"].as_str().expect("reason").contains("sensitive"));
    });
}

#[test]
fn answer_rejects_unknown_question_kind() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "");

        let args = answer::AnswerArgs {
            prompt: "Anything".to_string(),
            kind: "slider".to_string(),
            choices: String::new(),
            title: "SWE Intern".to_string(),
            company: String::new(),
        };
        let result = answer::run(load_for(path), args, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn tailor_writes_artifact_at_deterministic_path() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let base_path = dir.path().join("base_resume.txt");
        fs::write(
            &base_path,
            "Student engineer.\n\nSkills: Rust, SQL\n\n- Built a Rust service\n",
        )
        .expect("write base resume");

        let template_path = dir.path().join("resume.md.tera");
        fs::write(&template_path, "# {{ full_name }} for {{ role }}\n{{ top_skills }}\n")
            .expect("write template");

        let output_dir = dir.path().join("out");
        let config_body = format!(
            r#"
[resume]
base_resume_path = "{}"
template_path = "{}"
output_dir = "{}"

[qa.defaults]
full_name = "Casey Lee"
"#,
            base_path.display(),
            template_path.display(),
            output_dir.display(),
        );
        let path = write_config(&dir, &config_body);

        let args = tailor::TailorArgs {
            job_id: "4242".to_string(),
            title: "Backend Intern".to_string(),
            company: "Acme".to_string(),
            location: String::new(),
            url: String::new(),
            description: "Rust backend work".to_string(),
            description_file: None,
        };
        let result = tailor::run(load_for(path), args, true);
        assert_eq!(result.exit_code, 0, "tailor should succeed: {}", result.output);

        let payload = parse_payload(&result.output);
        let resume_path = payload["resume_path"].as_str().expect("resume path");
        assert!(resume_path.ends_with("acme-backend-intern-4242.md"));
        assert!(PathBuf::from(resume_path).exists());
    });
}

#[test]
fn commands_fail_with_config_error_class_on_invalid_config() {
    with_clean_env(|| {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"
[logging]
level = "verbose"
"#,
        );

        let result = decide::run(load_for(path), true, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}
