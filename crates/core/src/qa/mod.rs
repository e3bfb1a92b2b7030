use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::QaConfig;
use crate::domain::answer::QaAnswer;
use crate::domain::job::JobContext;
use crate::domain::question::{ApplicationQuestion, QuestionKind};
use crate::generate::{GenerationError, GenerationRequest, GenerativeBackend};

/// Prompts that must never be answered by guesswork. Matched as whole words
/// against the normalized prompt; configured patterns extend this list.
const SENSITIVE_PATTERNS: &[&str] = &[
    "authorized to work",
    "work authorization",
    "sponsorship",
    "visa",
    "gpa",
    "grade point average",
    "disability",
    "disabled",
    "veteran",
    "race",
    "ethnicity",
    "gender identity",
    "felony",
    "criminal",
    "convicted",
];

/// Markers for willingness/availability-style prompts where an affirmative
/// choice is a safe deterministic pick.
const WILLINGNESS_MARKERS: &[&str] =
    &["willing", "available", "availability", "relocate", "relocation", "open to", "comfortable"];

/// Resolver outcome requiring human input. Returned as a value, never an
/// error: the caller pauses, obtains the answer, and re-injects it via
/// `QaAnswer::user_provided`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Escalation {
    pub prompt: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Answered(QaAnswer),
    Escalated(Escalation),
}

impl Resolution {
    pub fn answer(&self) -> Option<&QaAnswer> {
        match self {
            Self::Answered(answer) => Some(answer),
            Self::Escalated(_) => None,
        }
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated(_))
    }
}

/// Maps an application-form prompt to an answer using configured defaults,
/// bounded heuristics, or an optional generative backend, in that order.
/// Sensitive prompts without a default always escalate.
#[derive(Clone, Debug)]
pub struct QuestionResolver {
    defaults: BTreeMap<String, String>,
    aliases: Vec<(String, Vec<String>)>,
    sensitive_patterns: Vec<String>,
    generic_fallback: Option<String>,
    max_answer_chars: usize,
}

impl QuestionResolver {
    pub fn from_config(qa: &QaConfig) -> Self {
        let defaults = qa
            .defaults
            .iter()
            .map(|(key, value)| (normalize_prompt(key), value.clone()))
            .collect();

        let aliases = qa
            .aliases
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|pattern| normalize_prompt(pattern))
                    .filter(|pattern| !pattern.is_empty())
                    .collect();
                (normalize_prompt(&rule.key), patterns)
            })
            .collect();

        let sensitive_patterns = SENSITIVE_PATTERNS
            .iter()
            .map(|pattern| (*pattern).to_string())
            .chain(qa.sensitive_patterns.iter().map(|pattern| normalize_prompt(pattern)))
            .filter(|pattern| !pattern.is_empty())
            .collect();

        Self {
            defaults,
            aliases,
            sensitive_patterns,
            generic_fallback: qa.generic_fallback.clone(),
            max_answer_chars: qa.max_answer_chars,
        }
    }

    pub fn resolve(
        &self,
        question: &ApplicationQuestion,
        job: &JobContext,
        backend: Option<&dyn GenerativeBackend>,
    ) -> Resolution {
        let normalized = normalize_prompt(&question.prompt);
        let choices = effective_choices(question);

        if let Some(default_value) = self.default_for(&normalized) {
            if let Some(answer) = self.answer_from_default(question, &choices, default_value) {
                debug!(prompt = %normalized, "resolved from configured default");
                return Resolution::Answered(answer);
            }
        }

        if let Some(pattern) = self.sensitive_match(&normalized) {
            debug!(prompt = %normalized, pattern = %pattern, "sensitive prompt escalated");
            return Resolution::Escalated(Escalation {
                prompt: question.prompt.clone(),
                reason: format!("sensitive prompt requires operator input (matched `{pattern}`)"),
            });
        }

        if question.kind.is_choice() && !choices.is_empty() {
            return self.resolve_choice(question, job, &normalized, &choices, backend);
        }

        self.resolve_free_text(question, job, backend)
    }

    fn default_for(&self, normalized: &str) -> Option<&str> {
        if let Some(value) = self.defaults.get(normalized) {
            return Some(value);
        }

        self.aliases
            .iter()
            .find(|(_, patterns)| {
                patterns.iter().any(|pattern| contains_phrase(normalized, pattern))
            })
            .and_then(|(key, _)| self.defaults.get(key))
            .map(String::as_str)
    }

    fn answer_from_default(
        &self,
        question: &ApplicationQuestion,
        choices: &[String],
        default_value: &str,
    ) -> Option<QaAnswer> {
        if !question.kind.is_choice() || choices.is_empty() {
            let value = truncate_chars(default_value, self.max_answer_chars);
            return Some(QaAnswer::from_default(&question.prompt, question.kind, vec![value]));
        }

        if question.kind == QuestionKind::MultiChoice {
            let values: Vec<String> = default_value
                .split([',', ';'])
                .filter_map(|part| match_choice(part.trim(), choices))
                .collect();
            if !values.is_empty() {
                return Some(QaAnswer::from_default(&question.prompt, question.kind, values));
            }
            return None;
        }

        match_choice(default_value, choices)
            .map(|value| QaAnswer::from_default(&question.prompt, question.kind, vec![value]))
    }

    fn resolve_choice(
        &self,
        question: &ApplicationQuestion,
        job: &JobContext,
        normalized: &str,
        choices: &[String],
        backend: Option<&dyn GenerativeBackend>,
    ) -> Resolution {
        if is_willingness_prompt(normalized) {
            if let Some(choice) = affirmative_choice(choices) {
                debug!(prompt = %normalized, "willingness prompt answered affirmatively");
                return Resolution::Answered(QaAnswer::generated(
                    &question.prompt,
                    question.kind,
                    vec![choice],
                ));
            }
        }

        if let Some(backend) = backend {
            match self.constrained_generation(question, job, choices, backend) {
                Ok(Some(answer)) => return Resolution::Answered(answer),
                Ok(None) => {}
                Err(escalation) => return Resolution::Escalated(escalation),
            }
        }

        Resolution::Answered(QaAnswer::generated(
            &question.prompt,
            question.kind,
            vec![choices[0].clone()],
        ))
    }

    /// One attempt plus one strict retry; a non-member answer after the
    /// retry escalates rather than guessing. Backend transport failures
    /// degrade to the deterministic fallback (`Ok(None)`).
    fn constrained_generation(
        &self,
        question: &ApplicationQuestion,
        job: &JobContext,
        choices: &[String],
        backend: &dyn GenerativeBackend,
    ) -> Result<Option<QaAnswer>, Escalation> {
        for strict_retry in [false, true] {
            let request = GenerationRequest {
                prompt: &question.prompt,
                job,
                allowed_choices: choices,
                max_chars: self.max_answer_chars,
                strict_retry,
            };
            match backend.generate(&request) {
                Ok(raw) => {
                    if let Some(value) = match_choice(raw.trim(), choices) {
                        return Ok(Some(QaAnswer::generated(
                            &question.prompt,
                            question.kind,
                            vec![value],
                        )));
                    }
                    if strict_retry {
                        let violation =
                            GenerationError::ConstraintViolation { answer: raw.trim().to_string() };
                        return Err(Escalation {
                            prompt: question.prompt.clone(),
                            reason: format!("{violation} after retry"),
                        });
                    }
                }
                Err(error) => {
                    warn!(prompt = %question.prompt, %error, "generation backend failed");
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    fn resolve_free_text(
        &self,
        question: &ApplicationQuestion,
        job: &JobContext,
        backend: Option<&dyn GenerativeBackend>,
    ) -> Resolution {
        if let Some(backend) = backend {
            let request = GenerationRequest {
                prompt: &question.prompt,
                job,
                allowed_choices: &[],
                max_chars: self.max_answer_chars,
                strict_retry: false,
            };
            match backend.generate(&request) {
                Ok(raw) => {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        let value = truncate_chars(trimmed, self.max_answer_chars);
                        return Resolution::Answered(QaAnswer::generated(
                            &question.prompt,
                            question.kind,
                            vec![value],
                        ));
                    }
                }
                Err(error) => {
                    warn!(prompt = %question.prompt, %error, "generation backend failed");
                }
            }
        }

        if let Some(fallback) = &self.generic_fallback {
            let value = truncate_chars(fallback, self.max_answer_chars);
            return Resolution::Answered(QaAnswer::from_default(
                &question.prompt,
                question.kind,
                vec![value],
            ));
        }

        Resolution::Escalated(Escalation {
            prompt: question.prompt.clone(),
            reason: "free-text prompt has no configured default and no generative backend"
                .to_string(),
        })
    }

    fn sensitive_match(&self, normalized: &str) -> Option<&str> {
        self.sensitive_patterns
            .iter()
            .find(|pattern| contains_phrase(normalized, pattern))
            .map(String::as_str)
    }
}

/// Case-fold, strip punctuation, collapse whitespace.
pub fn normalize_prompt(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }

    normalized
}

/// Whole-word phrase containment over normalized text.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let padded = format!(" {normalized} ");
    padded.contains(&format!(" {phrase} "))
}

fn is_willingness_prompt(normalized: &str) -> bool {
    WILLINGNESS_MARKERS.iter().any(|marker| contains_phrase(normalized, marker))
}

fn effective_choices(question: &ApplicationQuestion) -> Vec<String> {
    let trimmed: Vec<String> = question
        .choices
        .iter()
        .map(|choice| choice.trim().to_string())
        .filter(|choice| !choice.is_empty())
        .collect();

    if trimmed.is_empty() && question.kind == QuestionKind::Boolean {
        return vec!["Yes".to_string(), "No".to_string()];
    }
    trimmed
}

/// Maps a candidate answer onto a member of `choices`: exact
/// case-insensitive match first, then substring containment either way.
fn match_choice(answer: &str, choices: &[String]) -> Option<String> {
    if answer.is_empty() {
        return None;
    }
    let lowered = answer.to_lowercase();

    if let Some(exact) = choices.iter().find(|choice| choice.to_lowercase() == lowered) {
        return Some(exact.clone());
    }

    choices
        .iter()
        .find(|choice| {
            let choice_lowered = choice.to_lowercase();
            choice_lowered.contains(&lowered) || lowered.contains(&choice_lowered)
        })
        .cloned()
}

fn affirmative_choice(choices: &[String]) -> Option<String> {
    choices
        .iter()
        .find(|choice| {
            let lowered = choice.trim().to_lowercase();
            lowered == "yes" || lowered == "y" || lowered.starts_with("yes,")
                || lowered.starts_with("yes ")
        })
        .cloned()
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::config::{AliasRule, QaConfig};
    use crate::domain::answer::Provenance;
    use crate::domain::job::JobContext;
    use crate::domain::question::{ApplicationQuestion, QuestionKind};
    use crate::generate::{GenerationError, GenerationRequest, GenerativeBackend};

    use super::{normalize_prompt, QuestionResolver, Resolution};

    /// Backend that replays scripted responses and records every request.
    struct ScriptedBackend {
        responses: Mutex<Vec<Result<String, String>>>,
        requests: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<String, String>>) -> Self {
            Self { responses: Mutex::new(responses), requests: Mutex::new(Vec::new()) }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }

        fn strict_flags(&self) -> Vec<bool> {
            self.requests.lock().expect("requests lock").iter().map(|(_, s)| *s).collect()
        }
    }

    impl GenerativeBackend for ScriptedBackend {
        fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            self.requests
                .lock()
                .expect("requests lock")
                .push((request.prompt.to_string(), request.strict_retry));
            let mut responses = self.responses.lock().expect("responses lock");
            if responses.is_empty() {
                return Err(GenerationError::Backend("script exhausted".to_string()));
            }
            responses.remove(0).map_err(GenerationError::Backend)
        }
    }

    fn qa_config() -> QaConfig {
        QaConfig {
            defaults: [
                ("work_authorization_us".to_string(), "Yes".to_string()),
                ("graduation date".to_string(), "May 2027".to_string()),
                ("preferred languages".to_string(), "Rust, Python".to_string()),
            ]
            .into_iter()
            .collect(),
            aliases: vec![AliasRule {
                key: "work_authorization_us".to_string(),
                patterns: vec!["authorized to work".to_string()],
            }],
            sensitive_patterns: Vec::new(),
            generic_fallback: None,
            max_answer_chars: 1000,
        }
    }

    fn job() -> JobContext {
        JobContext { title: "SWE Intern".to_string(), company: "Acme".to_string() }
    }

    #[test]
    fn verbatim_default_wins_regardless_of_job_context() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question =
            ApplicationQuestion::new("Graduation Date?", QuestionKind::FreeText);

        for company in ["Acme", "Globex"] {
            let context =
                JobContext { title: "Intern".to_string(), company: company.to_string() };
            let resolution = resolver.resolve(&question, &context, None);
            let answer = resolution.answer().expect("default answer");
            assert_eq!(answer.values, vec!["May 2027".to_string()]);
            assert_eq!(answer.provenance, Provenance::Default);
        }
    }

    #[test]
    fn alias_pattern_routes_sensitive_prompt_onto_default() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question = ApplicationQuestion::new(
            "Are you legally authorized to work in the US?",
            QuestionKind::SingleChoice,
        )
        .with_choices(vec!["Yes".to_string(), "No".to_string()]);

        let resolution = resolver.resolve(&question, &job(), None);
        let answer = resolution.answer().expect("aliased default answer");
        assert_eq!(answer.values, vec!["Yes".to_string()]);
        assert_eq!(answer.provenance, Provenance::Default);
    }

    #[test]
    fn sensitive_prompt_without_default_escalates_and_never_calls_backend() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let backend = ScriptedBackend::new(vec![Ok("No".to_string())]);
        let question = ApplicationQuestion::new(
            "Will you require visa sponsorship?",
            QuestionKind::SingleChoice,
        )
        .with_choices(vec!["Yes".to_string(), "No".to_string()]);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        assert!(resolution.is_escalated());
        assert_eq!(backend.request_count(), 0, "sensitive prompts must not reach the backend");
    }

    #[test]
    fn default_is_preferred_over_backend_generation() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let backend = ScriptedBackend::new(vec![Ok("No".to_string())]);
        let question = ApplicationQuestion::new("graduation date", QuestionKind::FreeText);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        let answer = resolution.answer().expect("default answer");
        assert_eq!(answer.provenance, Provenance::Default);
        assert_eq!(backend.request_count(), 0);
    }

    #[test]
    fn willingness_prompt_prefers_affirmative_choice() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question =
            ApplicationQuestion::new("Are you willing to relocate?", QuestionKind::SingleChoice)
                .with_choices(vec!["No".to_string(), "Yes".to_string()]);

        let resolution = resolver.resolve(&question, &job(), None);
        let answer = resolution.answer().expect("heuristic answer");
        assert_eq!(answer.values, vec!["Yes".to_string()]);
        assert_eq!(answer.provenance, Provenance::Generated);
    }

    #[test]
    fn out_of_set_generation_is_retried_once_then_escalated() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let backend = ScriptedBackend::new(vec![
            Ok("Purple".to_string()),
            Ok("Turquoise".to_string()),
        ]);
        let question =
            ApplicationQuestion::new("Which office do you prefer?", QuestionKind::SingleChoice)
                .with_choices(vec!["Denver".to_string(), "Boston".to_string()]);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        assert!(resolution.is_escalated());
        assert_eq!(backend.strict_flags(), vec![false, true]);
    }

    #[test]
    fn retry_recovers_when_second_generation_is_a_member() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let backend =
            ScriptedBackend::new(vec![Ok("Purple".to_string()), Ok("Boston".to_string())]);
        let question =
            ApplicationQuestion::new("Which office do you prefer?", QuestionKind::SingleChoice)
                .with_choices(vec!["Denver".to_string(), "Boston".to_string()]);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        let answer = resolution.answer().expect("retried answer");
        assert_eq!(answer.values, vec!["Boston".to_string()]);
        assert_eq!(answer.provenance, Provenance::Generated);
    }

    #[test]
    fn backend_transport_failure_degrades_to_first_choice() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let backend = ScriptedBackend::new(vec![Err("connection refused".to_string())]);
        let question =
            ApplicationQuestion::new("Which team interests you?", QuestionKind::SingleChoice)
                .with_choices(vec!["Platform".to_string(), "Product".to_string()]);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        let answer = resolution.answer().expect("fallback answer");
        assert_eq!(answer.values, vec!["Platform".to_string()]);
        assert_eq!(answer.provenance, Provenance::Generated);
    }

    #[test]
    fn free_text_generation_is_truncated_to_configured_limit() {
        let mut config = qa_config();
        config.max_answer_chars = 12;
        let resolver = QuestionResolver::from_config(&config);
        let backend = ScriptedBackend::new(vec![Ok(
            "I admire the team's focus on developer tooling".to_string(),
        )]);
        let question =
            ApplicationQuestion::new("Why do you want to join?", QuestionKind::FreeText);

        let resolution = resolver.resolve(&question, &job(), Some(&backend));
        let answer = resolution.answer().expect("generated answer");
        assert_eq!(answer.values[0].chars().count(), 12);
        assert_eq!(answer.provenance, Provenance::Generated);
    }

    #[test]
    fn free_text_without_backend_uses_generic_fallback() {
        let mut config = qa_config();
        config.generic_fallback =
            Some("I am excited to learn more during the interview.".to_string());
        let resolver = QuestionResolver::from_config(&config);
        let question =
            ApplicationQuestion::new("Anything else to share?", QuestionKind::FreeText);

        let resolution = resolver.resolve(&question, &job(), None);
        let answer = resolution.answer().expect("fallback answer");
        assert_eq!(answer.provenance, Provenance::Default);
    }

    #[test]
    fn free_text_without_backend_or_fallback_escalates() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question =
            ApplicationQuestion::new("Describe a project you are proud of", QuestionKind::FreeText);

        let resolution = resolver.resolve(&question, &job(), None);
        match resolution {
            Resolution::Escalated(escalation) => {
                assert!(escalation.reason.contains("no generative backend"));
            }
            Resolution::Answered(answer) => {
                panic!("expected escalation, got answer {:?}", answer.values)
            }
        }
    }

    #[test]
    fn multi_choice_default_splits_on_separators() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question =
            ApplicationQuestion::new("Preferred languages", QuestionKind::MultiChoice)
                .with_choices(vec![
                    "Rust".to_string(),
                    "Go".to_string(),
                    "Python".to_string(),
                ]);

        let resolution = resolver.resolve(&question, &job(), None);
        let answer = resolution.answer().expect("multi-choice default");
        assert_eq!(answer.values, vec!["Rust".to_string(), "Python".to_string()]);
        assert_eq!(answer.provenance, Provenance::Default);
    }

    #[test]
    fn boolean_without_explicit_choices_gets_yes_no_domain() {
        let resolver = QuestionResolver::from_config(&qa_config());
        let question = ApplicationQuestion::new(
            "Are you available to start in June?",
            QuestionKind::Boolean,
        );

        let resolution = resolver.resolve(&question, &job(), None);
        let answer = resolution.answer().expect("boolean answer");
        assert_eq!(answer.values, vec!["Yes".to_string()]);
    }

    #[test]
    fn normalization_folds_case_punctuation_and_whitespace() {
        assert_eq!(
            normalize_prompt("  Are you AUTHORIZED   to work?? "),
            "are you authorized to work"
        );
        assert_eq!(normalize_prompt("G.P.A."), "g p a");
    }
}
