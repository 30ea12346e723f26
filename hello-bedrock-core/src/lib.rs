#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core types shared by the hello-bedrock crates.
//!
//! Holds the credential record and its loader, the prompt type, the [`SimplePrompt`] trait that
//! chat-model clients implement, and the error taxonomy used across the workspace.

pub mod credentials;
pub mod errors;
pub mod prompt;
mod traits;

pub use crate::credentials::{CredentialLoadError, CredentialRecord, load_credentials};
pub use crate::errors::{ClientConstructionError, LanguageModelError};
pub use crate::prompt::Prompt;
/// All traits are available from the root
pub use crate::traits::*;

#[cfg(feature = "test-utils")]
pub mod test_utils;
