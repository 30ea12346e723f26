//! Prompts an Amazon Bedrock inference profile once and prints the answer.
//!
//! Credentials and optional settings are read from a JSON config file, see [`settings`]. The
//! [`runner::InferenceRunner`] builds the client and reports the outcome on the console.
pub mod runner;
pub mod settings;

pub use runner::{BedrockFactory, ChatModelFactory, InferenceRunner, RunOutcome};
pub use settings::{AppConfig, ConfigError, CredentialDelivery, Settings, config_path};
