use thiserror::Error;

/// Failure kinds reported by generation and critique services.
///
/// The orchestrator only distinguishes *how* to react: transient errors go
/// through the retry strategy, fatal errors abort the run, malformed verdicts
/// become an automatic rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("transient service error: {0}")]
    Transient(String),

    #[error("fatal service error: {0}")]
    Fatal(String),

    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
}

impl ServiceError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedVerdict(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Fatal(_) => "fatal",
            Self::MalformedVerdict(_) => "malformed_verdict",
        }
    }
}
