//! Narrow interfaces to the external collaborators the orchestrator calls.
//!
//! The core never talks HTTP itself; concrete clients live in the plugins
//! crate and are injected as trait objects.

mod verdict;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::role::{PromptTemplate, Role, Rubric};

pub use verdict::{parse_verdict, Verdict, GENERIC_FEEDBACK};

/// One worker invocation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub role: Role,
    pub ticker: &'a str,
    pub template: &'a PromptTemplate,
    /// Fully assembled prompt context, including any correction directive.
    pub context: &'a str,
    /// 1-based attempt number.
    pub attempt: u32,
}

/// One critique invocation.
#[derive(Debug, Clone, Copy)]
pub struct CritiqueRequest<'a> {
    pub role: Role,
    pub ticker: &'a str,
    pub output: &'a str,
    pub rubric: &'a Rubric,
    pub attempt: u32,
}

/// The LLM that writes a role's output.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ServiceError>;
}

/// The manager that reviews a role's output against its rubric.
///
/// Implementations return [`ServiceError::MalformedVerdict`] when the
/// response cannot be read as a verdict; the controller turns that into a
/// rejection instead of a failure.
#[async_trait]
pub trait CritiqueService: Send + Sync {
    fn name(&self) -> &str;

    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<Verdict, ServiceError>;
}

/// Data-fetch collaborator supplying a role's initial source material.
///
/// The text is opaque to the orchestrator. `Ok(None)` means nothing is
/// available for this role.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, ticker: &str, role: Role) -> Result<Option<String>, ServiceError>;
}
