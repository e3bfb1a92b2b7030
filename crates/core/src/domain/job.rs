use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A posting as handed over by the external discovery mechanism.
/// Immutable once discovered; the core never fetches postings itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub discovered_at: DateTime<Utc>,
}

/// The slice of a posting that question answering is allowed to see.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub title: String,
    pub company: String,
}

impl JobPosting {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: JobId(id.into()),
            title: title.into(),
            company: String::new(),
            location: String::new(),
            description: String::new(),
            url: String::new(),
            discovered_at: Utc::now(),
        }
    }

    pub fn context(&self) -> JobContext {
        JobContext { title: self.title.clone(), company: self.company.clone() }
    }
}
