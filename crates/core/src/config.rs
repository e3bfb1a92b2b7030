use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Effective run configuration. Resolved once at startup, immutable for the
/// duration of the run; every core component receives the values it needs by
/// construction rather than reading ambient process state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub filters: FilterConfig,
    pub application: ApplicationConfig,
    pub resume: ResumeConfig,
    pub generation: GenerationConfig,
    pub qa: QaConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct FilterConfig {
    pub search_query: String,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub preferred_locations: Vec<String>,
    pub remote_only: bool,
    pub max_discovered_jobs: u32,
}

#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    pub dry_run: bool,
    pub auto_submit: bool,
    pub max_applications: u32,
    pub ledger_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ResumeConfig {
    pub base_resume_path: PathBuf,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub enabled: bool,
    pub provider: GenerationProvider,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_retries: u32,
}

impl GenerationConfig {
    /// Whether a generative backend can actually be constructed from this
    /// config. A missing key degrades the resolver to its non-generative
    /// paths instead of failing validation.
    pub fn is_ready(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.provider {
            GenerationProvider::OpenAi | GenerationProvider::Anthropic => self
                .api_key
                .as_ref()
                .map(|key| !key.expose_secret().trim().is_empty())
                .unwrap_or(false),
            GenerationProvider::Ollama => true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub key: String,
    pub patterns: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct QaConfig {
    /// Prompt key -> answer. Keys are matched after prompt normalization.
    pub defaults: BTreeMap<String, String>,
    /// Substring patterns routing free-form prompts onto default keys.
    pub aliases: Vec<AliasRule>,
    /// Extensions to the built-in sensitive-prompt list.
    pub sensitive_patterns: Vec<String>,
    /// Last-resort answer for free-text prompts when no backend is available.
    pub generic_fallback: Option<String>,
    pub max_answer_chars: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dry_run: Option<bool>,
    pub auto_submit: Option<bool>,
    pub max_applications: Option<u32>,
    pub generation_enabled: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            filters: FilterConfig {
                search_query: "software engineer intern".to_string(),
                include_keywords: vec![
                    "software".to_string(),
                    "engineer".to_string(),
                    "intern".to_string(),
                ],
                exclude_keywords: Vec::new(),
                preferred_locations: Vec::new(),
                remote_only: false,
                max_discovered_jobs: 150,
            },
            application: ApplicationConfig {
                dry_run: true,
                auto_submit: false,
                max_applications: 25,
                ledger_path: PathBuf::from("artifacts/application_results.jsonl"),
            },
            resume: ResumeConfig {
                base_resume_path: PathBuf::from("artifacts/base_resume.txt"),
                template_path: PathBuf::from("templates/resume.md.tera"),
                output_dir: PathBuf::from("artifacts/resumes"),
            },
            generation: GenerationConfig {
                enabled: true,
                provider: GenerationProvider::OpenAi,
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                max_retries: 1,
            },
            qa: QaConfig {
                defaults: BTreeMap::new(),
                aliases: Vec::new(),
                sensitive_patterns: Vec::new(),
                generic_fallback: None,
                max_answer_chars: 1000,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported generation provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("applypilot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(filters) = patch.filters {
            if let Some(search_query) = filters.search_query {
                self.filters.search_query = search_query;
            }
            if let Some(include_keywords) = filters.include_keywords {
                self.filters.include_keywords = include_keywords;
            }
            if let Some(exclude_keywords) = filters.exclude_keywords {
                self.filters.exclude_keywords = exclude_keywords;
            }
            if let Some(preferred_locations) = filters.preferred_locations {
                self.filters.preferred_locations = preferred_locations;
            }
            if let Some(remote_only) = filters.remote_only {
                self.filters.remote_only = remote_only;
            }
            if let Some(max_discovered_jobs) = filters.max_discovered_jobs {
                self.filters.max_discovered_jobs = max_discovered_jobs;
            }
        }

        if let Some(application) = patch.application {
            if let Some(dry_run) = application.dry_run {
                self.application.dry_run = dry_run;
            }
            if let Some(auto_submit) = application.auto_submit {
                self.application.auto_submit = auto_submit;
            }
            if let Some(max_applications) = application.max_applications {
                self.application.max_applications = max_applications;
            }
            if let Some(ledger_path) = application.ledger_path {
                self.application.ledger_path = PathBuf::from(ledger_path);
            }
        }

        if let Some(resume) = patch.resume {
            if let Some(base_resume_path) = resume.base_resume_path {
                self.resume.base_resume_path = PathBuf::from(base_resume_path);
            }
            if let Some(template_path) = resume.template_path {
                self.resume.template_path = PathBuf::from(template_path);
            }
            if let Some(output_dir) = resume.output_dir {
                self.resume.output_dir = PathBuf::from(output_dir);
            }
        }

        if let Some(generation) = patch.generation {
            if let Some(enabled) = generation.enabled {
                self.generation.enabled = enabled;
            }
            if let Some(provider) = generation.provider {
                self.generation.provider = provider;
            }
            if let Some(api_key_value) = generation.api_key {
                self.generation.api_key = Some(api_key_value.into());
            }
            if let Some(model) = generation.model {
                self.generation.model = model;
            }
            if let Some(max_retries) = generation.max_retries {
                self.generation.max_retries = max_retries;
            }
        }

        if let Some(qa) = patch.qa {
            if let Some(defaults) = qa.defaults {
                self.qa.defaults = defaults;
            }
            if let Some(aliases) = qa.aliases {
                self.qa.aliases = aliases;
            }
            if let Some(sensitive_patterns) = qa.sensitive_patterns {
                self.qa.sensitive_patterns = sensitive_patterns;
            }
            if let Some(generic_fallback) = qa.generic_fallback {
                self.qa.generic_fallback = Some(generic_fallback);
            }
            if let Some(max_answer_chars) = qa.max_answer_chars {
                self.qa.max_answer_chars = max_answer_chars;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("APPLYPILOT_DRY_RUN") {
            self.application.dry_run = parse_bool("APPLYPILOT_DRY_RUN", &value)?;
        }
        if let Some(value) = read_env("APPLYPILOT_AUTO_SUBMIT") {
            self.application.auto_submit = parse_bool("APPLYPILOT_AUTO_SUBMIT", &value)?;
        }
        if let Some(value) = read_env("APPLYPILOT_MAX_APPLICATIONS") {
            self.application.max_applications = parse_u32("APPLYPILOT_MAX_APPLICATIONS", &value)?;
        }
        if let Some(value) = read_env("APPLYPILOT_LEDGER_PATH") {
            self.application.ledger_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("APPLYPILOT_RESUME_BASE_PATH") {
            self.resume.base_resume_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("APPLYPILOT_RESUME_TEMPLATE_PATH") {
            self.resume.template_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("APPLYPILOT_RESUME_OUTPUT_DIR") {
            self.resume.output_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("APPLYPILOT_GENERATION_ENABLED") {
            self.generation.enabled = parse_bool("APPLYPILOT_GENERATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("APPLYPILOT_GENERATION_PROVIDER") {
            self.generation.provider = value.parse()?;
        }
        if let Some(value) = read_env("APPLYPILOT_GENERATION_API_KEY") {
            self.generation.api_key = Some(value.into());
        }
        if let Some(value) = read_env("APPLYPILOT_GENERATION_MODEL") {
            self.generation.model = value;
        }
        if let Some(value) = read_env("APPLYPILOT_GENERATION_MAX_RETRIES") {
            self.generation.max_retries = parse_u32("APPLYPILOT_GENERATION_MAX_RETRIES", &value)?;
        }

        let log_level =
            read_env("APPLYPILOT_LOGGING_LEVEL").or_else(|| read_env("APPLYPILOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("APPLYPILOT_LOGGING_FORMAT").or_else(|| read_env("APPLYPILOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dry_run) = overrides.dry_run {
            self.application.dry_run = dry_run;
        }
        if let Some(auto_submit) = overrides.auto_submit {
            self.application.auto_submit = auto_submit;
        }
        if let Some(max_applications) = overrides.max_applications {
            self.application.max_applications = max_applications;
        }
        if let Some(generation_enabled) = overrides.generation_enabled {
            self.generation.enabled = generation_enabled;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_filters(&self.filters)?;
        validate_application(&self.application)?;
        validate_resume(&self.resume)?;
        validate_qa(&self.qa)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("applypilot.toml"), PathBuf::from("config/applypilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_filters(filters: &FilterConfig) -> Result<(), ConfigError> {
    if filters.max_discovered_jobs == 0 {
        return Err(ConfigError::Validation(
            "filters.max_discovered_jobs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_application(application: &ApplicationConfig) -> Result<(), ConfigError> {
    if application.max_applications == 0 {
        return Err(ConfigError::Validation(
            "application.max_applications must be greater than zero".to_string(),
        ));
    }
    if application.ledger_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "application.ledger_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_resume(resume: &ResumeConfig) -> Result<(), ConfigError> {
    if resume.base_resume_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "resume.base_resume_path must not be empty".to_string(),
        ));
    }
    if resume.template_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "resume.template_path must not be empty".to_string(),
        ));
    }
    if resume.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("resume.output_dir must not be empty".to_string()));
    }
    Ok(())
}

fn validate_qa(qa: &QaConfig) -> Result<(), ConfigError> {
    if qa.max_answer_chars == 0 || qa.max_answer_chars > 10_000 {
        return Err(ConfigError::Validation(
            "qa.max_answer_chars must be in range 1..=10000".to_string(),
        ));
    }
    for rule in &qa.aliases {
        if rule.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "qa.aliases entries must carry a non-empty key".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    filters: Option<FiltersPatch>,
    application: Option<ApplicationPatch>,
    resume: Option<ResumePatch>,
    generation: Option<GenerationPatch>,
    qa: Option<QaPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct FiltersPatch {
    search_query: Option<String>,
    include_keywords: Option<Vec<String>>,
    exclude_keywords: Option<Vec<String>>,
    preferred_locations: Option<Vec<String>>,
    remote_only: Option<bool>,
    max_discovered_jobs: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationPatch {
    dry_run: Option<bool>,
    auto_submit: Option<bool>,
    max_applications: Option<u32>,
    ledger_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResumePatch {
    base_resume_path: Option<String>,
    template_path: Option<String>,
    output_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationPatch {
    enabled: Option<bool>,
    provider: Option<GenerationProvider>,
    api_key: Option<String>,
    model: Option<String>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct QaPatch {
    defaults: Option<BTreeMap<String, String>>,
    aliases: Option<Vec<AliasRule>>,
    sensitive_patterns: Option<Vec<String>>,
    generic_fallback: Option<String>,
    max_answer_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
