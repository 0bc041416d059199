use thiserror::Error;

/// Outcome of a single listener callback.
pub type ListenerResult = std::result::Result<(), ListenerError>;

/// Failure reported by an invalidation or change listener.
///
/// Dispatch isolates these per listener: the error is handed to the
/// `"observable:error"` hook and the remaining listeners still run.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener failed: {message}")]
    Failed { message: String },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + 'static>),
}

impl ListenerError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Invalid engine configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown trim policy: {value} (expected `reclaim` or `legacy`)")]
    UnknownTrimPolicy { value: String },

    #[error("invalid boolean for {var}: {value}")]
    InvalidFlag { var: &'static str, value: String },
}
