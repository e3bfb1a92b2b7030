use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use crate::config::{QaConfig, ResumeConfig};
use crate::domain::job::{JobId, JobPosting};

const TEMPLATE_NAME: &str = "resume";
const MAX_SKILLS: usize = 8;
const MAX_HIGHLIGHTS: usize = 6;
const MIN_TOKEN_LEN: usize = 3;

/// Common words ignored when extracting salient terms from a description.
const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "you", "your", "our", "are", "will", "this", "that", "have",
    "from", "who", "what", "been", "they", "their", "them", "has", "was", "not", "but", "all",
    "can", "its", "into", "about", "work", "working", "team", "role", "job", "internship",
    "intern", "position", "candidate", "experience", "ability", "strong", "including",
];

#[derive(Debug, Error)]
pub enum TailorError {
    #[error("could not read {what} `{path}`: {source}")]
    ReadInput { what: &'static str, path: PathBuf, source: std::io::Error },
    #[error("base resume `{path}` has no content")]
    EmptyBaseResume { path: PathBuf },
    #[error("resume template error: {0}")]
    Template(String),
    #[error("could not write resume artifact `{path}`: {source}")]
    WriteArtifact { path: PathBuf, source: std::io::Error },
}

/// Output of one tailoring pass. Never mutated after creation; a re-run for
/// the same job supersedes the file at the same deterministic path.
#[derive(Clone, Debug, PartialEq)]
pub struct ResumeArtifact {
    pub job_id: JobId,
    pub content: String,
    pub path: PathBuf,
    pub generated_at: DateTime<Utc>,
}

/// Renders a per-job resume from the base resume and a named-slot template.
///
/// Selection only, never invention: every skill and highlight in the output
/// is lifted verbatim from the base resume, reordered by overlap with the
/// job description. Job metadata (title, company, location) fills dedicated
/// template slots.
#[derive(Debug)]
pub struct TailorEngine {
    tera: Tera,
    contact: BTreeMap<String, String>,
    output_dir: PathBuf,
    summary: String,
    skill_inventory: Vec<String>,
    bullet_lines: Vec<String>,
    vocabulary: BTreeMap<String, String>,
}

impl TailorEngine {
    pub fn from_config(resume: &ResumeConfig, qa: &QaConfig) -> Result<Self, TailorError> {
        let base_resume =
            fs::read_to_string(&resume.base_resume_path).map_err(|source| {
                TailorError::ReadInput {
                    what: "base resume",
                    path: resume.base_resume_path.clone(),
                    source,
                }
            })?;
        if base_resume.trim().is_empty() {
            return Err(TailorError::EmptyBaseResume { path: resume.base_resume_path.clone() });
        }

        let template = fs::read_to_string(&resume.template_path).map_err(|source| {
            TailorError::ReadInput {
                what: "resume template",
                path: resume.template_path.clone(),
                source,
            }
        })?;

        Self::new(&base_resume, &template, qa.defaults.clone(), resume.output_dir.clone())
    }

    pub fn new(
        base_resume: &str,
        template: &str,
        contact: BTreeMap<String, String>,
        output_dir: PathBuf,
    ) -> Result<Self, TailorError> {
        if base_resume.trim().is_empty() {
            return Err(TailorError::EmptyBaseResume { path: PathBuf::from("<inline>") });
        }

        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|error| TailorError::Template(error.to_string()))?;

        Ok(Self {
            tera,
            contact,
            output_dir,
            summary: leading_paragraph(base_resume),
            skill_inventory: skill_inventory(base_resume),
            bullet_lines: bullet_lines(base_resume),
            vocabulary: vocabulary(base_resume),
        })
    }

    pub fn tailor(&self, job: &JobPosting) -> Result<ResumeArtifact, TailorError> {
        let salient = self.salient_terms(&job.description);
        let top_skills = self.select_skills(&salient);
        let highlights = self.select_highlights(&salient);

        let mut context = Context::new();
        for key in ["full_name", "email", "phone", "linkedin", "github", "graduation"] {
            context.insert(key, self.contact.get(key).map(String::as_str).unwrap_or(""));
        }
        context.insert("role", &job.title);
        context.insert("company", &job.company);
        context.insert("location", &job.location);
        context.insert("summary", &self.summary);
        context.insert("top_skills", &bullet_list(&top_skills));
        context.insert("experience_highlights", &bullet_list(&highlights));

        let content = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|error| TailorError::Template(error.to_string()))?;

        let slug = safe_slug(&format!("{}-{}-{}", job.company, job.title, job.id.0), 60);
        let path = self.output_dir.join(format!("{slug}.md"));

        fs::create_dir_all(&self.output_dir)
            .map_err(|source| TailorError::WriteArtifact { path: path.clone(), source })?;
        fs::write(&path, &content)
            .map_err(|source| TailorError::WriteArtifact { path: path.clone(), source })?;

        info!(
            job_id = %job.id.0,
            path = %path.display(),
            skills = top_skills.len(),
            highlights = highlights.len(),
            "resume artifact rendered"
        );

        Ok(ResumeArtifact { job_id: job.id.clone(), content, path, generated_at: Utc::now() })
    }

    /// Description tokens that also occur in the base resume, ranked by
    /// description frequency. The intersection guarantees nothing outside
    /// the base vocabulary can be foregrounded.
    fn salient_terms(&self, description: &str) -> Vec<String> {
        let mut frequency: BTreeMap<String, usize> = BTreeMap::new();
        for token in tokenize(description) {
            if STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            if self.vocabulary.contains_key(&token) {
                *frequency.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().map(|(token, _)| token).collect()
    }

    fn select_skills(&self, salient: &[String]) -> Vec<String> {
        if self.skill_inventory.is_empty() {
            return salient
                .iter()
                .filter_map(|token| self.vocabulary.get(token).cloned())
                .take(MAX_SKILLS)
                .collect();
        }

        let mut scored: Vec<(usize, &String)> = self
            .skill_inventory
            .iter()
            .map(|skill| {
                let score = tokenize(skill)
                    .filter(|token| salient.contains(token))
                    .count();
                (score, skill)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut selected: Vec<String> = scored
            .iter()
            .filter(|(score, _)| *score > 0)
            .map(|(_, skill)| (*skill).clone())
            .collect();
        for skill in &self.skill_inventory {
            if selected.len() >= MAX_SKILLS {
                break;
            }
            if !selected.contains(skill) {
                selected.push(skill.clone());
            }
        }
        selected.truncate(MAX_SKILLS);
        selected
    }

    fn select_highlights(&self, salient: &[String]) -> Vec<String> {
        let mut scored: Vec<(usize, &String)> = self
            .bullet_lines
            .iter()
            .map(|line| {
                let score =
                    tokenize(line).filter(|token| salient.contains(token)).count();
                (score, line)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let matched: Vec<String> = scored
            .iter()
            .filter(|(score, _)| *score > 0)
            .map(|(_, line)| (*line).clone())
            .take(MAX_HIGHLIGHTS)
            .collect();
        if !matched.is_empty() {
            return matched;
        }

        self.bullet_lines.iter().take(3).cloned().collect()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .map(|token| token.to_lowercase())
}

/// Lowercase token -> display form as first seen in the base resume.
fn vocabulary(base_resume: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for raw in base_resume.split(|ch: char| !ch.is_alphanumeric()) {
        if raw.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        map.entry(raw.to_lowercase()).or_insert_with(|| raw.to_string());
    }
    map
}

/// The skill inventory is the comma/semicolon list on a line labeled
/// `Skills:`; absent that, selection falls back to raw vocabulary overlap.
fn skill_inventory(base_resume: &str) -> Vec<String> {
    base_resume
        .lines()
        .map(str::trim)
        .map(|line| line.trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| line.to_lowercase().starts_with("skills"))
        .filter_map(|line| line.split_once(':'))
        .flat_map(|(_, rest)| rest.split([',', ';']))
        .map(|skill| skill.trim().to_string())
        .filter(|skill| !skill.is_empty())
        .collect()
}

fn bullet_lines(base_resume: &str) -> Vec<String> {
    base_resume
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-') || line.starts_with('*') || line.starts_with('•'))
        .map(|line| line.trim_start_matches(['-', '*', '•']).trim().to_string())
        .filter(|line| !line.is_empty() && !line.to_lowercase().starts_with("skills"))
        .collect()
}

fn leading_paragraph(base_resume: &str) -> String {
    base_resume
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty() && !line.starts_with('-') && !line.starts_with('*'))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

fn safe_slug(value: &str, limit: usize) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = true;

    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    let slug: String = slug.trim_matches('-').chars().take(limit).collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "job".to_string()
    } else {
        slug
    }
}
