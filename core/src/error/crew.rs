use thiserror::Error;

use super::code::ErrorCode;
use super::service::ServiceError;
use crate::executor::types::TaskStatus;
use crate::role::Role;

/// Run-level errors for graph construction and orchestration.
#[derive(Error, Debug)]
pub enum CrewError {
    #[error("Duplicate role: {0}")]
    DuplicateRole(Role),

    #[error("Role '{0}' cannot be scheduled as a task")]
    InvalidRole(Role),

    #[error("Dependency not found: role '{role}' depends on '{missing_dep}'")]
    DependencyNotFound { role: Role, missing_dep: Role },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Dependency unsatisfied: role '{role}' needs terminal output of '{dependency}'")]
    DependencyUnsatisfied { role: Role, dependency: Role },

    #[error("Invalid status transition for '{role}': {from:?} -> {to:?}")]
    InvalidTransition {
        role: Role,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Role '{role}' failed: {source}")]
    RoleFailed {
        role: Role,
        #[source]
        source: ServiceError,
    },

    #[error("Role '{role}' task aborted: {message}")]
    TaskAborted { role: Role, message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl CrewError {
    pub fn role_failed(role: Role, source: ServiceError) -> Self {
        Self::RoleFailed { role, source }
    }

    /// The role whose stage broke, when the failure is attributable to one.
    pub fn failing_role(&self) -> Option<Role> {
        match self {
            Self::RoleFailed { role, .. }
            | Self::TaskAborted { role, .. }
            | Self::DependencyUnsatisfied { role, .. }
            | Self::InvalidTransition { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateRole(_) | Self::InvalidRole(_) | Self::InvalidTicker(_) => {
                ErrorCode::ValidationError
            }
            Self::DependencyNotFound { .. } | Self::DependencyUnsatisfied { .. } => {
                ErrorCode::DependencyError
            }
            Self::CircularDependency(_) => ErrorCode::CircularDependency,
            Self::InvalidTransition { .. } | Self::TaskAborted { .. } => ErrorCode::GeneralError,
            Self::RoleFailed { source, .. } => match source {
                ServiceError::Transient(_) => ErrorCode::NetworkError,
                ServiceError::Fatal(_) => ErrorCode::BackendError,
                ServiceError::MalformedVerdict(_) => ErrorCode::BackendError,
            },
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Config(_) => ErrorCode::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_failed_identifies_role() {
        let err = CrewError::role_failed(Role::Macro, ServiceError::fatal("quota exceeded"));
        assert_eq!(err.failing_role(), Some(Role::Macro));
        assert_eq!(err.error_code(), ErrorCode::BackendError);
        assert!(err.to_string().contains("macro"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_graph_errors_have_no_role() {
        let err = CrewError::CircularDependency("quant -> fundamental -> quant".into());
        assert_eq!(err.failing_role(), None);
        assert_eq!(err.error_code(), ErrorCode::CircularDependency);
    }
}
