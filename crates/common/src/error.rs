//! Shared error types for the observability pipeline.
//!
//! Every isolated unit of work in the pipeline (one health probe, one
//! collector pass, one push or export attempt, one alert predicate) reports
//! its failure as a [`CommonError`] and is consumed at the isolation
//! boundary. Observability code must never be the reason the host process
//! fails, so these errors are converted into reported outcomes rather than
//! propagated upward.

use thiserror::Error;

/// Result alias used across the workspace.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors produced inside the observability pipeline.
#[derive(Debug, Error)]
pub enum CommonError {
    /// Delivering an encoded payload to an external target failed.
    #[error("delivery to '{target}' failed: {message}")]
    Delivery {
        /// Name of the push target or export destination.
        target: String,
        /// Human-readable failure detail.
        message: String,
    },

    /// Encoding telemetry into a wire format failed.
    #[error("failed to encode {format} payload: {message}")]
    Encoding {
        /// Wire format being produced (e.g. "prometheus", "json").
        format: String,
        /// Human-readable failure detail.
        message: String,
    },

    /// A health probe could not complete.
    #[error("probe '{name}' failed: {message}")]
    Probe {
        /// Probe or check name.
        name: String,
        /// Human-readable failure detail.
        message: String,
    },

    /// A registration or lookup referenced an unknown name.
    #[error("unknown {kind} '{name}'")]
    Unknown {
        /// What was looked up (e.g. "destination", "metric").
        kind: &'static str,
        /// The name that did not resolve.
        name: String,
    },

    /// Configuration rejected at composition time.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable rejection detail.
        message: String,
    },

    /// All retry attempts were exhausted.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Stringified final error.
        last_error: String,
    },
}

impl CommonError {
    /// Build a [`CommonError::Delivery`] from anything displayable.
    pub fn delivery(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Delivery { target: target.into(), message: message.to_string() }
    }

    /// Build a [`CommonError::Encoding`] from anything displayable.
    pub fn encoding(format: impl Into<String>, message: impl ToString) -> Self {
        Self::Encoding { format: format.into(), message: message.to_string() }
    }

    /// Build a [`CommonError::Probe`] from anything displayable.
    pub fn probe(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Probe { name: name.into(), message: message.to_string() }
    }

    /// Build a [`CommonError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }
}
