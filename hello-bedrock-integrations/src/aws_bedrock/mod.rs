//! An integration with the AWS Bedrock service.
//!
//! Prompts a model, or a cross-region inference profile, through the Bedrock runtime. The
//! Converse API is used by default; Llama models can also be prompted through `InvokeModel` with
//! their native request format.
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_bedrockruntime::{
    Client,
    config::{BehaviorVersion, Region, retry::RetryConfig},
    error::{ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::{ConverseOutput, InferenceConfiguration, Message},
};
use derive_builder::Builder;
use hello_bedrock_core::{ClientConstructionError, CredentialRecord, LanguageModelError};

#[cfg(test)]
use mockall::automock;

mod models;
mod simple_prompt;

pub use self::models::ModelFamily;

/// Provider name attached to credentials handed over explicitly
const EXPLICIT_CREDENTIALS_PROVIDER: &str = "hello-bedrock-config";

/// An integration with the AWS Bedrock service.
///
/// Can be used as `SimplePrompt`.
///
/// The model id can be a plain model id, a model arn or an inference profile id such as
/// `us.meta.llama3-1-8b-instruct-v1:0`. The client is bound to a single region.
///
/// Credentials can be handed over explicitly with [`AwsBedrockBuilder::credentials`]. Without
/// them, `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are read from the environment when the
/// request is signed.
///
/// Building never touches the network. Retries are disabled, every prompt results in exactly one
/// request.
#[derive(Debug, Clone, Builder)]
#[builder(
    setter(strip_option),
    build_fn(error = ClientConstructionError, validate = "Self::validate")
)]
pub struct AwsBedrock {
    #[builder(setter(into))]
    /// The model id, arn or inference profile id to use
    model_id: String,

    #[builder(setter(into))]
    /// The region the runtime client is bound to
    region: String,

    #[builder(
        setter(custom),
        field(
            ty = "Option<Credentials>",
            build = "self.explicit_credentials.is_some()"
        )
    )]
    /// Whether requests are signed with explicit credentials. The credentials themselves only
    /// live in the runtime client.
    explicit_credentials: bool,

    #[builder(default, setter(into))]
    /// Overrides the Bedrock runtime endpoint
    endpoint_url: Option<String>,

    #[builder(default = self.default_client(), setter(custom))]
    /// The bedrock runtime client
    client: Arc<dyn BedrockPrompt>,

    #[builder(default)]
    /// The model configuration to use
    model_config: ModelConfig,

    #[builder(default)]
    /// The model family to use. Converse works for every model supporting it.
    model_family: ModelFamily,
}

#[cfg_attr(test, automock)]
#[async_trait]
trait BedrockPrompt: std::fmt::Debug + Send + Sync {
    async fn prompt_converse(
        &self,
        model_id: &str,
        message: Message,
        inference_config: InferenceConfiguration,
    ) -> Result<ConverseOutput, LanguageModelError>;

    async fn prompt_u8(&self, model_id: &str, blob: Blob) -> Result<Vec<u8>, LanguageModelError>;
}

#[async_trait]
impl BedrockPrompt for Client {
    async fn prompt_converse(
        &self,
        model_id: &str,
        message: Message,
        inference_config: InferenceConfiguration,
    ) -> Result<ConverseOutput, LanguageModelError> {
        let response = self
            .converse()
            .model_id(model_id)
            .messages(message)
            .inference_config(inference_config)
            .send()
            .await
            .map_err(|e| {
                let transport = is_transport_error(&e);
                sdk_error_to_language_model_error(e.into_service_error(), transport)
            })?;

        tracing::debug!(
            stop_reason = response.stop_reason.as_str(),
            usage = ?response.usage,
            "Converse call finished"
        );

        response.output.ok_or_else(|| {
            LanguageModelError::permanent(anyhow::anyhow!(
                "Bedrock response for {model_id} did not contain any output"
            ))
        })
    }

    async fn prompt_u8(&self, model_id: &str, blob: Blob) -> Result<Vec<u8>, LanguageModelError> {
        let response = self
            .invoke_model()
            .body(blob)
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .send()
            .await
            .map_err(|e| {
                let transport = is_transport_error(&e);
                sdk_error_to_language_model_error(e.into_service_error(), transport)
            })?;

        Ok(response.body.into_inner())
    }
}

/// Timeouts and failures to dispatch or read a response never reached the model.
fn is_transport_error<E, R>(error: &SdkError<E, R>) -> bool {
    matches!(
        error,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    )
}

/// Maps a Bedrock service error onto a [`LanguageModelError`]
///
/// Throttling and availability problems are transient, validation errors about the input size
/// mean the context length was exceeded. Everything else is permanent.
fn sdk_error_to_language_model_error<E>(error: E, transport: bool) -> LanguageModelError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = error.code().unwrap_or_default().to_string();
    let message = error.message().unwrap_or_default().to_ascii_lowercase();

    if transport {
        tracing::warn!(error = %error, "Bedrock request failed in transport");
        return LanguageModelError::TransientError(error.into());
    }

    match code.as_str() {
        "ThrottlingException"
        | "ServiceUnavailableException"
        | "InternalServerException"
        | "ModelNotReadyException"
        | "ModelTimeoutException" => {
            tracing::warn!(code = %code, "Bedrock server error: {message}");
            LanguageModelError::TransientError(error.into())
        }
        "ValidationException"
            if message.contains("too long")
                || message.contains("context length")
                || message.contains("maximum context") =>
        {
            LanguageModelError::ContextLengthExceeded(error.into())
        }
        _ => {
            tracing::error!(code = %code, "Bedrock client error: {message}");
            LanguageModelError::PermanentError(error.into())
        }
    }
}

impl AwsBedrock {
    pub fn builder() -> AwsBedrockBuilder {
        AwsBedrockBuilder::default()
    }

    /// Build a new `AwsBedrock` instance using the Converse API
    pub fn build_converse(model_id: impl Into<String>) -> AwsBedrockBuilder {
        Self::builder().converse().model_id(model_id).to_owned()
    }

    /// Build a new `AwsBedrock` instance with the Llama model family
    pub fn build_llama_family(model_id: impl Into<String>) -> AwsBedrockBuilder {
        Self::builder().llama().model_id(model_id).to_owned()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    pub fn model_family(&self) -> ModelFamily {
        self.model_family
    }

    /// False if credentials are resolved from the environment when signing
    pub fn has_explicit_credentials(&self) -> bool {
        self.explicit_credentials
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }
}

impl AwsBedrockBuilder {
    /// Set the model family to Llama, prompted with `InvokeModel`
    pub fn llama(&mut self) -> &mut Self {
        self.model_family = Some(ModelFamily::Llama);
        self
    }

    /// Prompt through the Converse API
    pub fn converse(&mut self) -> &mut Self {
        self.model_family = Some(ModelFamily::Converse);
        self
    }

    /// Sign requests with these credentials instead of reading them from the environment
    pub fn credentials(&mut self, credentials: &CredentialRecord) -> &mut Self {
        self.explicit_credentials = Some(Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            None,
            None,
            EXPLICIT_CREDENTIALS_PROVIDER,
        ));
        self
    }

    /// Set the aws bedrock runtime client
    pub fn client(&mut self, client: Client) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    #[cfg(test)]
    #[allow(private_bounds)]
    pub fn test_client(&mut self, client: impl BedrockPrompt + 'static) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    fn validate(&self) -> Result<(), ClientConstructionError> {
        if self
            .model_id
            .as_ref()
            .is_some_and(|model_id| model_id.trim().is_empty())
        {
            return Err(ClientConstructionError::invalid(
                "model_id",
                "must not be empty",
            ));
        }

        if self
            .region
            .as_ref()
            .is_some_and(|region| region.trim().is_empty())
        {
            return Err(ClientConstructionError::invalid("region", "must not be empty"));
        }

        if let Some(model_config) = &self.model_config {
            model_config.validate()?;
        }

        Ok(())
    }

    fn default_client(&self) -> Arc<dyn BedrockPrompt> {
        let region = self.region.clone().unwrap_or_default();

        let mut config = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .retry_config(RetryConfig::disabled());

        config = match self.explicit_credentials.clone() {
            Some(credentials) => config.credentials_provider(credentials),
            None => config.credentials_provider(EnvironmentVariableCredentialsProvider::new()),
        };

        if let Some(Some(endpoint_url)) = &self.endpoint_url {
            config = config.endpoint_url(endpoint_url);
        }

        Arc::new(Client::from_conf(config.build()))
    }
}

/// Inference parameters sent with every prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Sampling temperature, between 0.0 and 1.0
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub max_tokens: i32,
    pub top_p: Option<f32>,
    pub stop_sequences: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
            top_p: None,
            stop_sequences: vec![],
        }
    }
}

impl ModelConfig {
    /// Checks the parameters are within the ranges Bedrock accepts
    ///
    /// # Errors
    ///
    /// Returns [`ClientConstructionError::InvalidSetting`] naming the offending parameter
    pub fn validate(&self) -> Result<(), ClientConstructionError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ClientConstructionError::invalid(
                "temperature",
                format!("{} is not between 0.0 and 1.0", self.temperature),
            ));
        }

        if self.max_tokens <= 0 {
            return Err(ClientConstructionError::invalid(
                "max_tokens",
                format!("{} must be positive", self.max_tokens),
            ));
        }

        if let Some(top_p) = self.top_p.filter(|top_p| !(0.0..=1.0).contains(top_p)) {
            return Err(ClientConstructionError::invalid(
                "top_p",
                format!("{top_p} is not between 0.0 and 1.0"),
            ));
        }

        Ok(())
    }

    pub(crate) fn to_inference_configuration(&self) -> InferenceConfiguration {
        InferenceConfiguration::builder()
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .set_top_p(self.top_p)
            .set_stop_sequences(
                (!self.stop_sequences.is_empty()).then(|| self.stop_sequences.clone()),
            )
            .build()
    }
}
