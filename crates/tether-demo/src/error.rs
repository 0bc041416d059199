use thiserror::Error;

use tether_core::ConfigError;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not install log subscriber: {message}")]
    Logging { message: String },

    #[error("scenario {scenario} diverged: {message}")]
    Scenario {
        scenario: &'static str,
        message: String,
    },
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Logging { .. } => 3,
            Self::Scenario { .. } => 1,
        }
    }

    #[must_use]
    pub fn scenario(scenario: &'static str, message: impl Into<String>) -> Self {
        Self::Scenario {
            scenario,
            message: message.into(),
        }
    }
}
