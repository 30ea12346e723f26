use serde::{Deserialize, Serialize};

use super::ModelConfig;

/// Wraps a single user turn in the Llama 3 instruct chat template
pub(crate) fn llama_chat_prompt(prompt: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\n{prompt}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n"
    )
}

#[derive(Serialize, Debug)]
pub(crate) struct LlamaRequest {
    pub(crate) prompt: String,
    pub(crate) temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f32>,
    pub(crate) max_gen_len: i32,
}

impl LlamaRequest {
    pub(crate) fn new(prompt: &str, model_config: &ModelConfig) -> Self {
        Self {
            prompt: llama_chat_prompt(prompt),
            temperature: model_config.temperature,
            top_p: model_config.top_p,
            max_gen_len: model_config.max_tokens,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct LlamaResponse {
    pub(crate) generation: String,
    #[serde(default)]
    pub(crate) prompt_token_count: Option<i32>,
    #[serde(default)]
    pub(crate) generation_token_count: Option<i32>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
}
