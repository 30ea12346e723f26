//! Run settings and the config file they are read from
//!
//! A single JSON file carries the credentials and, optionally, a `bedrock` object overriding the
//! defaults below. Missing keys fall back to their defaults, unknown keys are ignored.
//!
//! ```json
//! {
//!   "aws_access_key_id": "AKIA...",
//!   "aws_secret_access_key": "...",
//!   "bedrock": {
//!     "region": "us-east-2",
//!     "inference_profile_id": "us.meta.llama3-1-8b-instruct-v1:0",
//!     "temperature": 0.7,
//!     "max_tokens": 500
//!   }
//! }
//! ```
use std::path::{Path, PathBuf};

use hello_bedrock_core::{
    CredentialLoadError, CredentialRecord,
    credentials::{DEFAULT_CREDENTIALS_FILE, read_json},
};
use hello_bedrock_integrations::aws_bedrock::ModelFamily;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_INFERENCE_PROFILE_ID: &str = "us.meta.llama3-1-8b-instruct-v1:0";
pub const DEFAULT_PROMPT: &str = "What's the meaning of 'Hello World' in programming?";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Overrides the location of the config file
pub const CONFIG_PATH_ENV: &str = "HELLO_BEDROCK_CONFIG";

const SETTINGS_KEY: &str = "bedrock";

/// How the credentials reach the chat-model client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialDelivery {
    /// Handed to the client constructor, the process environment is left alone
    #[default]
    Explicit,
    /// Published as `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` and resolved by the SDK
    Environment,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: String,
    /// Inference profile (or model) id the client is scoped to
    pub inference_profile_id: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub credential_delivery: CredentialDelivery,
    pub model_family: ModelFamily,
    pub endpoint_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            inference_profile_id: DEFAULT_INFERENCE_PROFILE_ID.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            credential_delivery: CredentialDelivery::default(),
            model_family: ModelFamily::default(),
            endpoint_url: None,
        }
    }
}

#[derive(Error, Debug, strum_macros::IntoStaticStr)]
pub enum ConfigError {
    #[error(transparent)]
    Credentials(#[from] CredentialLoadError),

    #[error("invalid `bedrock` settings in {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Category label of the error, as printed next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Credentials(err) => err.kind(),
            Self::Settings { .. } => self.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Credentials(err) => err.path(),
            Self::Settings { path, .. } => path,
        }
    }
}

/// Everything read from the config file
#[derive(Debug)]
pub struct AppConfig {
    pub credentials: CredentialRecord,
    pub settings: Settings,
}

impl AppConfig {
    /// Reads the config file once and extracts credentials and settings from it
    ///
    /// # Errors
    ///
    /// Any [`CredentialLoadError`], or [`ConfigError::Settings`] if the `bedrock` object does
    /// not match [`Settings`].
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()), err)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = read_json(path)?;
        let credentials = CredentialRecord::from_json(path, &document)?;

        let settings = match document.get(SETTINGS_KEY) {
            None | Some(Value::Null) => Settings::default(),
            Some(value) => {
                Settings::deserialize(value).map_err(|source| ConfigError::Settings {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };

        tracing::debug!(?settings, "Loaded config");

        Ok(Self {
            credentials,
            settings,
        })
    }
}

/// Location of the config file: `$HELLO_BEDROCK_CONFIG`, or `config.json` in the working
/// directory
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE), PathBuf::from)
}
