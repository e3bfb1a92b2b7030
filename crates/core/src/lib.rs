pub mod config;
pub mod domain;
pub mod filter;
pub mod gate;
pub mod generate;
pub mod ledger;
pub mod qa;
pub mod tailor;

pub use config::{
    AliasRule, AppConfig, ConfigError, ConfigOverrides, GenerationProvider, LoadOptions,
    LogFormat,
};
pub use domain::answer::{Provenance, QaAnswer};
pub use domain::job::{JobContext, JobId, JobPosting};
pub use domain::outcome::{RunOutcome, RunStatus};
pub use domain::question::{ApplicationQuestion, QuestionKind};
pub use filter::{FilterDecision, JobFilter};
pub use gate::{SubmitDecision, SubmitPolicy};
pub use generate::{GenerationError, GenerationRequest, GenerativeBackend};
pub use ledger::{JsonlLedger, LedgerError, MemoryLedger, OutcomeSink};
pub use qa::{Escalation, QuestionResolver, Resolution};
pub use tailor::{ResumeArtifact, TailorEngine, TailorError};
