//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `crew_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, ConcurrencyConfig, ContextConfig, CritiqueConfig,
    GenerationConfig, LoggingConfig, OutputConfig, RetryConfig, RevisionConfig,
};
pub use crate::error::{CliError, CrewError, ErrorCode, ServiceError};
pub use crate::executor::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin};
pub use crate::executor::{
    cancel_pair, AnalysisEngine, AnalysisEngineBuilder, CancelHandle, CancelToken, ExecutionOpts,
    ExponentialBackoffPlugin, RevisionHistory, RevisionPolicy, RoleOutcome, TaskStatus, TraceLog,
    TraceRecord,
};
pub use crate::report::AnalysisReport;
pub use crate::role::{PromptTemplate, Role, RoleProfile, RoleRegistry, Rubric};
pub use crate::service::{
    parse_verdict, ContextSource, CritiqueRequest, CritiqueService, GenerationRequest,
    GenerationService, Verdict, GENERIC_FEEDBACK,
};
pub use crate::util::normalize_ticker;
