use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    primitives::Blob,
    types::{ContentBlock, ConversationRole, ConverseOutput, Message},
};
use hello_bedrock_core::{LanguageModelError, SimplePrompt, prompt::Prompt};

use super::{AwsBedrock, ModelFamily};

#[async_trait]
impl SimplePrompt for AwsBedrock {
    #[tracing::instrument(skip_all, fields(model_id = %self.model_id, region = %self.region), err)]
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        if prompt.is_blank() {
            return Err(LanguageModelError::permanent(anyhow::anyhow!(
                "Refusing to send an empty prompt"
            )));
        }

        match self.model_family {
            ModelFamily::Converse => self.prompt_with_converse(prompt.render()).await,
            ModelFamily::Llama => self.prompt_with_invoke_model(prompt.render()).await,
        }
    }
}

impl AwsBedrock {
    async fn prompt_with_converse(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(prompt.to_string()))
            .build()
            .map_err(LanguageModelError::permanent)?;

        tracing::debug!(prompt, "[SimplePrompt] Request to bedrock converse");

        let output = self
            .client
            .prompt_converse(
                &self.model_id,
                message,
                self.model_config.to_inference_configuration(),
            )
            .await?;

        let response = text_from_converse_output(&output)?;

        tracing::debug!(response = %response, "[SimplePrompt] Response from bedrock converse");

        Ok(response)
    }

    async fn prompt_with_invoke_model(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let blob = self
            .model_family
            .build_request_to_bytes(prompt, &self.model_config)
            .map(Blob::new)?;

        let response_bytes = self.client.prompt_u8(&self.model_id, blob).await?;

        tracing::debug!(
            "Received response: {:?}",
            std::str::from_utf8(&response_bytes).map_err(LanguageModelError::permanent)
        );

        self.model_family.output_message_from_bytes(&response_bytes)
    }
}

/// Joins the text blocks of the assistant message
fn text_from_converse_output(output: &ConverseOutput) -> Result<String, LanguageModelError> {
    let message = output.as_message().map_err(|output| {
        LanguageModelError::permanent(anyhow::anyhow!(
            "Unexpected converse output: {output:?}"
        ))
    })?;

    let text = message
        .content()
        .iter()
        .filter_map(|block| block.as_text().ok())
        .map(String::as_str)
        .collect::<String>();

    if text.is_empty() {
        return Err(LanguageModelError::permanent(anyhow::anyhow!(
            "No text in response"
        )));
    }

    Ok(text)
}
