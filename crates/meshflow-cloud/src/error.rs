//! Error taxonomy for control-plane operations
//!
//! Every error carries the resource kind and identifying key it happened on,
//! plus the underlying provider message, so a failed run can be diagnosed
//! without re-querying the cloud.

use crate::types::ResourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    /// The control plane refused the call (quota, permission, malformed
    /// request). Fatal for that resource; the provider's own error code and
    /// message are preserved verbatim and never auto-retried.
    #[error("provider rejected {kind} '{name}': {message}")]
    ProviderRejected {
        kind: ResourceKind,
        name: String,
        /// Provider error code (e.g. "UnauthorizedOperation"), when present.
        code: Option<String>,
        message: String,
    },

    /// A gating condition did not become true within the wait budget.
    /// Retryable: a later converge picks up where this one stopped.
    #[error("dependency not ready: {what} (gave up after {attempts} attempts, {waited_ms}ms)")]
    DependencyNotReady {
        what: String,
        attempts: u32,
        waited_ms: u64,
    },

    /// A delete was attempted while dependents still exist.
    #[error("dependency violation on {kind} '{name}': {message}")]
    DependencyViolation {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    /// A resource that was expected to exist is gone.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    /// A resource reported a state the workflow cannot proceed from,
    /// e.g. a peering connection that moved to `failed`.
    #[error("{kind} '{name}' is in unexpected state '{state}'")]
    InvalidState {
        kind: ResourceKind,
        name: String,
        state: String,
    },
}

impl CloudError {
    pub fn rejected(
        kind: ResourceKind,
        name: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderRejected {
            kind,
            name: name.into(),
            code,
            message: message.into(),
        }
    }

    pub fn violation(
        kind: ResourceKind,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DependencyViolation {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether the caller may retry the whole operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyNotReady { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_dependency_violation(&self) -> bool {
        matches!(self, Self::DependencyViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
