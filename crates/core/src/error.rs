//! Error taxonomy shared by every pipeline stage and serving surface.

use thiserror::Error;

/// Errors surfaced by pipeline stages and serving layers.
///
/// Each variant carries a distinct recovery contract: `SourceUnavailable`
/// may be absorbed by a fallback tier, `InsufficientData` halts the run
/// with the failing stage named, and `ModelArtifact` makes every
/// prediction-dependent surface unavailable until retraining.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external source (prices, articles, remote scorer) failed.
    #[error("source unavailable: {name}: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// A stage produced no usable rows; the run stops here.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The persisted model artifact is missing or corrupt.
    #[error("model artifact unavailable: {0}")]
    ModelArtifact(String),

    /// The underlying sentiment or probability model failed on valid input.
    #[error("model inference failed: {0}")]
    ModelInference(String),

    /// Configuration failed validation at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An alert rule failed validation (duplicate id, unknown id, no conditions).
    #[error("invalid alert rule: {0}")]
    InvalidRule(String),

    /// A persistence operation failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Builds a `SourceUnavailable` for the named source.
    #[must_use]
    pub fn source_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_unavailable_names_the_source() {
        let err = PipelineError::source_unavailable("yahoo", "connect timeout");
        assert_eq!(
            err.to_string(),
            "source unavailable: yahoo: connect timeout"
        );
    }

    #[test]
    fn insufficient_data_names_the_stage() {
        let err = PipelineError::InsufficientData("aggregation produced no bars".to_string());
        assert!(err.to_string().contains("aggregation"));
    }

    #[test]
    fn io_errors_convert_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = PipelineError::from(io);
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
