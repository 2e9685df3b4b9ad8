//! Typed errors for the orchestration pipeline.
//!
//! Every component of the pipeline returns [`PipelineError`], so callers
//! can tell a bad request from a provider fault from a missing entity
//! without parsing messages.

use thiserror::Error;

/// Errors raised by the orchestration pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed caller input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The provider answered with something the protocol does not allow:
    /// an unexpected HTTP status, a missing operation handle, an unknown
    /// poll status, or an undecodable body.
    #[error("provider protocol error: {0}")]
    ProviderProtocol(String),

    /// The provider reported the analysis as `failed`.
    #[error("analysis failed: {message}")]
    AnalysisFailed { message: String },

    /// The operation was still pending after the configured number of polls.
    #[error("analysis still pending after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },

    /// A required entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Invalid pipeline configuration (router or categories).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The provider could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// A repository or blob-store backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for the "expected absence" outcome, which callers should not
    /// report as a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors that originate at the external analyzer.
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            Self::ProviderProtocol(_)
                | Self::AnalysisFailed { .. }
                | Self::PollTimeout { .. }
                | Self::Transport(_)
        )
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_failures() {
        let err = PipelineError::not_found("analysis result", "d1");
        assert!(err.is_not_found());
        assert!(!err.is_provider_fault());
        assert_eq!(err.to_string(), "analysis result not found: d1");
    }

    #[test]
    fn test_timeout_is_not_a_protocol_error() {
        let err = PipelineError::PollTimeout { attempts: 3 };
        assert!(err.is_provider_fault());
        assert!(!matches!(err, PipelineError::ProviderProtocol(_)));
    }
}
