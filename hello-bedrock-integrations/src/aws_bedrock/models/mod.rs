use anyhow::Context as _;
use hello_bedrock_core::LanguageModelError;
use serde::{Deserialize, Serialize};

use super::ModelConfig;

mod llama;

pub(crate) use llama::*;

/// Request format used to prompt a model.
///
/// The Converse API is model agnostic. Families with a native `InvokeModel` format can be
/// selected explicitly when Converse is not an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    Converse,
    Llama,
}

impl ModelFamily {
    pub(crate) fn build_request_to_bytes(
        self,
        prompt: &str,
        model_config: &ModelConfig,
    ) -> Result<Vec<u8>, LanguageModelError> {
        match self {
            ModelFamily::Llama => serde_json::to_vec(&LlamaRequest::new(prompt, model_config))
                .context("Failed to serialize llama request")
                .map_err(LanguageModelError::permanent),
            ModelFamily::Converse => Err(LanguageModelError::permanent(anyhow::anyhow!(
                "Converse requests are not sent as raw bytes"
            ))),
        }
    }

    pub(crate) fn output_message_from_bytes(
        self,
        bytes: &[u8],
    ) -> Result<String, LanguageModelError> {
        match self {
            ModelFamily::Llama => {
                let response: LlamaResponse = serde_json::from_slice(bytes)
                    .context("Failed to parse llama response")
                    .map_err(LanguageModelError::permanent)?;

                tracing::debug!(
                    prompt_tokens = ?response.prompt_token_count,
                    generation_tokens = ?response.generation_token_count,
                    stop_reason = ?response.stop_reason,
                    "Llama generation finished"
                );

                Ok(response.generation)
            }
            ModelFamily::Converse => Err(LanguageModelError::permanent(anyhow::anyhow!(
                "Converse responses are not received as raw bytes"
            ))),
        }
    }
}
