use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use applypilot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(load: LoadOptions) -> String {
    let config_file_path = detect_config_path(load.config_path.as_deref());
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = if config.generation.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let generic_fallback = match &config.qa.generic_fallback {
        Some(_) => "<set>".to_string(),
        None => "<unset>".to_string(),
    };

    let entries: Vec<(&str, String, Option<&str>)> = vec![
        ("filters.search_query", config.filters.search_query.clone(), None),
        (
            "filters.include_keywords",
            format!("{:?}", config.filters.include_keywords),
            None,
        ),
        (
            "filters.exclude_keywords",
            format!("{:?}", config.filters.exclude_keywords),
            None,
        ),
        ("filters.remote_only", config.filters.remote_only.to_string(), None),
        (
            "application.dry_run",
            config.application.dry_run.to_string(),
            Some("APPLYPILOT_DRY_RUN"),
        ),
        (
            "application.auto_submit",
            config.application.auto_submit.to_string(),
            Some("APPLYPILOT_AUTO_SUBMIT"),
        ),
        (
            "application.max_applications",
            config.application.max_applications.to_string(),
            Some("APPLYPILOT_MAX_APPLICATIONS"),
        ),
        (
            "application.ledger_path",
            config.application.ledger_path.display().to_string(),
            Some("APPLYPILOT_LEDGER_PATH"),
        ),
        (
            "resume.base_resume_path",
            config.resume.base_resume_path.display().to_string(),
            Some("APPLYPILOT_RESUME_BASE_PATH"),
        ),
        (
            "resume.template_path",
            config.resume.template_path.display().to_string(),
            Some("APPLYPILOT_RESUME_TEMPLATE_PATH"),
        ),
        (
            "resume.output_dir",
            config.resume.output_dir.display().to_string(),
            Some("APPLYPILOT_RESUME_OUTPUT_DIR"),
        ),
        (
            "generation.enabled",
            config.generation.enabled.to_string(),
            Some("APPLYPILOT_GENERATION_ENABLED"),
        ),
        (
            "generation.provider",
            format!("{:?}", config.generation.provider),
            Some("APPLYPILOT_GENERATION_PROVIDER"),
        ),
        (
            "generation.model",
            config.generation.model.clone(),
            Some("APPLYPILOT_GENERATION_MODEL"),
        ),
        ("generation.api_key", api_key.to_string(), Some("APPLYPILOT_GENERATION_API_KEY")),
        (
            "generation.max_retries",
            config.generation.max_retries.to_string(),
            Some("APPLYPILOT_GENERATION_MAX_RETRIES"),
        ),
        ("qa.defaults", format!("{} entries", config.qa.defaults.len()), None),
        ("qa.aliases", format!("{} rules", config.qa.aliases.len()), None),
        ("qa.generic_fallback", generic_fallback, None),
        ("qa.max_answer_chars", config.qa.max_answer_chars.to_string(), None),
        ("logging.level", config.logging.level.clone(), Some("APPLYPILOT_LOGGING_LEVEL")),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            Some("APPLYPILOT_LOGGING_FORMAT"),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source = field_source(
            key,
            env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {key} = {value} (source: {source})"));
    }
    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("applypilot.toml"), PathBuf::from("config/applypilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
