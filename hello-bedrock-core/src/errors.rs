use derive_builder::UninitializedFieldError;
use thiserror::Error;

/// Errors returned by a chat model when it is prompted.
#[derive(Error, Debug, strum_macros::IntoStaticStr)]
pub enum LanguageModelError {
    #[error("Context length exceeded: {0:#}")]
    ContextLengthExceeded(anyhow::Error),
    #[error("Permanent error: {0:#}")]
    PermanentError(anyhow::Error),
    #[error("Transient error: {0:#}")]
    TransientError(anyhow::Error),
}

impl LanguageModelError {
    pub fn permanent(e: impl Into<anyhow::Error>) -> Self {
        Self::PermanentError(e.into())
    }

    pub fn transient(e: impl Into<anyhow::Error>) -> Self {
        Self::TransientError(e.into())
    }

    /// Category label of the error, as printed next to the message
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<anyhow::Error> for LanguageModelError {
    fn from(e: anyhow::Error) -> Self {
        Self::PermanentError(e)
    }
}

/// Errors raised while constructing a chat-model client from its configuration.
#[derive(Error, Debug, strum_macros::IntoStaticStr)]
pub enum ClientConstructionError {
    #[error("missing required client setting `{0}`")]
    MissingSetting(&'static str),

    #[error("invalid client setting `{setting}`: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },
}

impl ClientConstructionError {
    pub fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting,
            reason: reason.into(),
        }
    }

    /// Category label of the error, as printed next to the message
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<UninitializedFieldError> for ClientConstructionError {
    fn from(e: UninitializedFieldError) -> Self {
        Self::MissingSetting(e.field_name())
    }
}
