use crate::config::FilterConfig;
use crate::domain::job::JobPosting;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject { reason: String },
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Screens discovered postings against the configured filter criteria.
/// Matching is case-insensitive over title, company, location, and
/// description; reject reasons are stable strings fit for the ledger.
#[derive(Clone, Debug)]
pub struct JobFilter {
    include_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    preferred_locations: Vec<String>,
    remote_only: bool,
}

impl JobFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            include_keywords: lowercase_nonempty(&config.include_keywords),
            exclude_keywords: lowercase_nonempty(&config.exclude_keywords),
            preferred_locations: lowercase_nonempty(&config.preferred_locations),
            remote_only: config.remote_only,
        }
    }

    pub fn evaluate(&self, job: &JobPosting) -> FilterDecision {
        let haystack = format!(
            "{}\n{}\n{}\n{}",
            job.title, job.company, job.location, job.description
        )
        .to_lowercase();

        if !self.include_keywords.is_empty()
            && !self.include_keywords.iter().any(|kw| haystack.contains(kw))
        {
            return FilterDecision::Reject {
                reason: "filter_mismatch:include_keywords".to_string(),
            };
        }

        if let Some(kw) = self.exclude_keywords.iter().find(|kw| haystack.contains(*kw)) {
            return FilterDecision::Reject {
                reason: format!("filter_mismatch:exclude_keyword:{kw}"),
            };
        }

        if self.remote_only && !haystack.contains("remote") {
            return FilterDecision::Reject { reason: "filter_mismatch:remote_only".to_string() };
        }

        if !self.preferred_locations.is_empty()
            && !self.preferred_locations.iter().any(|loc| haystack.contains(loc))
        {
            return FilterDecision::Reject { reason: "filter_mismatch:location".to_string() };
        }

        FilterDecision::Accept
    }
}

fn lowercase_nonempty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}
