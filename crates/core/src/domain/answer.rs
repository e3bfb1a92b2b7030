use serde::{Deserialize, Serialize};

use crate::domain::question::QuestionKind;

/// How an answer was produced. Recorded per answer and echoed into the
/// run ledger so reporting can distinguish deterministic fills from
/// generated ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Default,
    Generated,
    UserEscalated,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Generated => "generated",
            Self::UserEscalated => "user_escalated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub prompt: String,
    pub kind: QuestionKind,
    pub values: Vec<String>,
    pub provenance: Provenance,
}

impl QaAnswer {
    pub fn from_default(
        prompt: impl Into<String>,
        kind: QuestionKind,
        values: Vec<String>,
    ) -> Self {
        Self { prompt: prompt.into(), kind, values, provenance: Provenance::Default }
    }

    pub fn generated(prompt: impl Into<String>, kind: QuestionKind, values: Vec<String>) -> Self {
        Self { prompt: prompt.into(), kind, values, provenance: Provenance::Generated }
    }

    /// Wraps a human-provided value after an escalation round-trip. The
    /// orchestrator re-injects this; the core never fabricates it.
    pub fn user_provided(
        prompt: impl Into<String>,
        kind: QuestionKind,
        values: Vec<String>,
    ) -> Self {
        Self { prompt: prompt.into(), kind, values, provenance: Provenance::UserEscalated }
    }

    pub fn primary_value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }
}
