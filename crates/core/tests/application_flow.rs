//! Drives one job through the full decision flow the way the external
//! orchestrator does: filter, tailor, resolve each form question, evaluate
//! the submit gate, record the outcome.

use std::collections::BTreeMap;
use std::fs;

use applypilot_core::{
    ApplicationQuestion, FilterDecision, JobFilter, JobPosting, JsonlLedger, OutcomeSink,
    Provenance, QaAnswer, QuestionKind, QuestionResolver, RunOutcome, RunStatus, SubmitPolicy,
    TailorEngine,
};
use applypilot_core::config::AppConfig;
use tempfile::TempDir;

const BASE_RESUME: &str = "\
Computer science student shipping reliable backend services.

Skills: Rust, Python, SQL

- Built a telemetry pipeline in Rust
- Automated reporting with Python and SQL
";

const TEMPLATE: &str = "\
# {{ full_name }} — {{ role }} at {{ company }}

{{ summary }}

## Skills
{{ top_skills }}

## Highlights
{{ experience_highlights }}
";

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.qa.defaults = BTreeMap::from([
        ("full_name".to_string(), "Casey Lee".to_string()),
        ("work_authorization_us".to_string(), "Yes".to_string()),
    ]);
    config.qa.aliases = vec![applypilot_core::AliasRule {
        key: "work_authorization_us".to_string(),
        patterns: vec!["authorized to work".to_string()],
    }];
    config
}

fn discovered_job() -> JobPosting {
    let mut job = JobPosting::new("8811", "Software Engineer Intern");
    job.company = "Acme Robotics".to_string();
    job.location = "Denver, CO".to_string();
    job.description = "Work on Rust services and SQL pipelines.".to_string();
    job.url = "https://board.example.com/jobs/8811".to_string();
    job
}

#[test]
fn full_flow_records_a_single_well_formed_outcome() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config();
    let job = discovered_job();

    // Phase 1: filter.
    let filter = JobFilter::new(&config.filters);
    assert!(filter.evaluate(&job).is_accept());

    // Phase 2: resume artifact, generated before any question is answered.
    let engine = TailorEngine::new(
        BASE_RESUME,
        TEMPLATE,
        config.qa.defaults.clone(),
        dir.path().join("resumes"),
    )
    .expect("engine");
    let artifact = engine.tailor(&job).expect("tailor");
    assert!(artifact.content.contains("Casey Lee — Software Engineer Intern at Acme Robotics"));

    // Phase 3: one question per form field.
    let resolver = QuestionResolver::from_config(&config.qa);
    let context = job.context();
    let mut provenance: Vec<Provenance> = Vec::new();

    let authorized = resolver.resolve(
        &ApplicationQuestion::new(
            "Are you legally authorized to work in the United States?",
            QuestionKind::SingleChoice,
        )
        .with_choices(vec!["Yes".to_string(), "No".to_string()]),
        &context,
        None,
    );
    let authorized = authorized.answer().expect("aliased default").clone();
    assert_eq!(authorized.provenance, Provenance::Default);
    provenance.push(authorized.provenance);

    let relocate = resolver.resolve(
        &ApplicationQuestion::new("Are you willing to relocate?", QuestionKind::Boolean),
        &context,
        None,
    );
    let relocate = relocate.answer().expect("willingness heuristic").clone();
    assert_eq!(relocate.provenance, Provenance::Generated);
    provenance.push(relocate.provenance);

    // Sensitive prompt with no default: control returns to the caller, who
    // obtains the value from a human and re-injects it.
    let sponsorship = resolver.resolve(
        &ApplicationQuestion::new(
            "Do you now or in the future require visa sponsorship?",
            QuestionKind::SingleChoice,
        )
        .with_choices(vec!["Yes".to_string(), "No".to_string()]),
        &context,
        None,
    );
    assert!(sponsorship.is_escalated());
    let sponsorship = QaAnswer::user_provided(
        "Do you now or in the future require visa sponsorship?",
        QuestionKind::SingleChoice,
        vec!["No".to_string()],
    );
    provenance.push(sponsorship.provenance);

    // Phase 4: the gate stops a dry run even with everything answered.
    let decision = SubmitPolicy::from_config(&config.application).decide(true);
    assert!(!decision.proceed);
    assert_eq!(decision.reason, "dry_run");

    // Phase 5: exactly one ledger record for the job.
    let ledger_path = dir.path().join("ledger.jsonl");
    let ledger = JsonlLedger::open(&ledger_path).expect("open ledger");
    let outcome = RunOutcome::new(&job, RunStatus::StoppedBeforeSubmit, decision.reason)
        .with_resume_path(artifact.path.clone())
        .with_answer_provenance(provenance);
    ledger.record(&outcome).expect("record outcome");

    let raw = fs::read_to_string(&ledger_path).expect("read ledger");
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 1);

    let recorded: RunOutcome = serde_json::from_str(lines[0]).expect("well-formed ledger line");
    assert_eq!(recorded.job_id.0, "8811");
    assert_eq!(recorded.status, RunStatus::StoppedBeforeSubmit);
    assert_eq!(recorded.reason, "dry_run");
    assert_eq!(recorded.resume_path.as_deref(), Some(artifact.path.as_path()));
    assert_eq!(
        recorded.answer_provenance,
        vec![Provenance::Default, Provenance::Generated, Provenance::UserEscalated]
    );
}

#[test]
fn filtered_out_jobs_skip_tailoring_and_record_skip_reason() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config();

    let mut job = JobPosting::new("9901", "Sales Development Representative");
    job.description = "Outbound pipeline generation".to_string();

    let filter = JobFilter::new(&config.filters);
    let decision = filter.evaluate(&job);
    let reason = match decision {
        FilterDecision::Reject { reason } => reason,
        FilterDecision::Accept => panic!("sales posting should not pass the intern filter"),
    };

    let ledger = JsonlLedger::open(dir.path().join("ledger.jsonl")).expect("open ledger");
    ledger
        .record(&RunOutcome::new(&job, RunStatus::Skipped, reason.clone()))
        .expect("record skip");

    let raw = fs::read_to_string(ledger.path()).expect("read ledger");
    let recorded: RunOutcome = serde_json::from_str(raw.lines().next().expect("one line"))
        .expect("parse skip record");
    assert_eq!(recorded.status, RunStatus::Skipped);
    assert_eq!(recorded.reason, "filter_mismatch:include_keywords");
    assert!(recorded.resume_path.is_none());
}

#[test]
fn re_running_tailor_for_the_same_job_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config();
    let job = discovered_job();

    let engine = TailorEngine::new(
        BASE_RESUME,
        TEMPLATE,
        config.qa.defaults.clone(),
        dir.path().join("resumes"),
    )
    .expect("engine");

    let first = engine.tailor(&job).expect("first run");
    let second = engine.tailor(&job).expect("second run");

    assert_eq!(first.path, second.path);
    assert_eq!(first.content, second.content);
    assert_eq!(
        fs::read_dir(dir.path().join("resumes")).expect("output dir").count(),
        1,
        "re-runs supersede the artifact instead of adding siblings"
    );
}
