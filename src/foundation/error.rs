use std::time::Duration;

/// Convenience result type used across grimreel.
pub type GrimResult<T> = Result<T, GrimError>;

/// Top-level error taxonomy.
///
/// Planning errors ([`GrimError::InvalidAsset`], [`GrimError::TimelineInconsistency`]) point at
/// a defect in the inputs or the planner and are never retried. Collaborator errors are retried
/// by [`RetryPolicy`](crate::RetryPolicy) before they reach the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum GrimError {
    /// Unusable upstream material (zero duration, no images, malformed descriptors).
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// A render plan invariant does not hold.
    #[error("timeline inconsistency [{invariant}]: {detail}")]
    TimelineInconsistency {
        /// Stable short name of the violated invariant.
        invariant: &'static str,
        /// Offending values.
        detail: String,
    },

    /// Invalid pacing or pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A collaborator could not serve the request.
    #[error("provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable {
        /// Collaborator name.
        provider: String,
        /// Provider-side reason.
        reason: String,
    },

    /// A collaborator asked us to slow down.
    #[error("provider '{provider}' rate limited")]
    RateLimited {
        /// Collaborator name.
        provider: String,
        /// Suggested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// A collaborator call exceeded its time budget.
    #[error("'{operation}' timed out after {after:?}")]
    Timeout {
        /// Operation label.
        operation: String,
        /// Budget that was exceeded.
        after: Duration,
    },

    /// The render consumer failed to realize a plan.
    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    /// Work was cancelled before it completed.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Story database read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GrimError {
    /// Build a [`GrimError::InvalidAsset`] value.
    pub fn invalid_asset(msg: impl Into<String>) -> Self {
        Self::InvalidAsset(msg.into())
    }

    /// Build a [`GrimError::TimelineInconsistency`] value.
    pub fn timeline(invariant: &'static str, detail: impl Into<String>) -> Self {
        Self::TimelineInconsistency {
            invariant,
            detail: detail.into(),
        }
    }

    /// Build a [`GrimError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`GrimError::ProviderUnavailable`] value.
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`GrimError::EncodingFailure`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    /// Build a [`GrimError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`GrimError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Collaborator errors that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::RateLimited { .. } | Self::Timeout { .. }
        )
    }

    /// Errors raised by planning itself.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAsset(_) | Self::TimelineInconsistency { .. }
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
