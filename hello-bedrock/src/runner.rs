//! Runs a single prompt against a chat model and reports the outcome on the console
//!
//! The run is linear: construct the client, prompt it once, print the answer. Construction and
//! invocation are separate failure boundaries. A construction failure ends the run early, an
//! invocation failure is reported and the run still completes. Neither is retried.
use std::fmt;
use std::io::{self, Write};

use hello_bedrock_core::{ClientConstructionError, CredentialRecord, SimplePrompt, prompt::Prompt};
use hello_bedrock_integrations::aws_bedrock::{AwsBedrock, ModelConfig};

use crate::settings::{CredentialDelivery, Settings};

pub const RESPONSE_BANNER: &str = "--- Response from Amazon Bedrock ---";
pub const RESPONSE_FOOTER: &str = "-----------------------------------";
pub const ERROR_BANNER: &str = "--- ERROR ---";
pub const ERROR_FOOTER: &str = "------------";
pub const COMPLETION_BANNER: &str = "Hello World demonstration complete!";

/// Builds the chat-model client a run prompts
pub trait ChatModelFactory {
    type Model: SimplePrompt;

    /// `credentials` is `None` when the client is expected to resolve them from the environment
    ///
    /// # Errors
    ///
    /// Returns [`ClientConstructionError`] if the settings are rejected
    fn build(
        &self,
        settings: &Settings,
        credentials: Option<&CredentialRecord>,
    ) -> Result<Self::Model, ClientConstructionError>;
}

/// Use a closure as a factory
impl<F, M> ChatModelFactory for F
where
    F: Fn(&Settings, Option<&CredentialRecord>) -> Result<M, ClientConstructionError>,
    M: SimplePrompt,
{
    type Model = M;

    fn build(
        &self,
        settings: &Settings,
        credentials: Option<&CredentialRecord>,
    ) -> Result<M, ClientConstructionError> {
        self(settings, credentials)
    }
}

/// Builds an [`AwsBedrock`] client scoped to the configured inference profile and region
#[derive(Debug, Default, Clone, Copy)]
pub struct BedrockFactory;

impl ChatModelFactory for BedrockFactory {
    type Model = AwsBedrock;

    fn build(
        &self,
        settings: &Settings,
        credentials: Option<&CredentialRecord>,
    ) -> Result<AwsBedrock, ClientConstructionError> {
        let max_tokens = i32::try_from(settings.max_tokens).map_err(|_| {
            ClientConstructionError::invalid(
                "max_tokens",
                format!("{} is too large", settings.max_tokens),
            )
        })?;

        let mut builder = AwsBedrock::builder();
        builder
            .model_id(&settings.inference_profile_id)
            .region(&settings.region)
            .model_family(settings.model_family)
            .model_config(ModelConfig {
                temperature: settings.temperature,
                max_tokens,
                ..ModelConfig::default()
            });

        if let Some(credentials) = credentials {
            builder.credentials(credentials);
        }

        if let Some(endpoint_url) = &settings.endpoint_url {
            builder.endpoint_url(endpoint_url);
        }

        let bedrock = builder.build()?;

        tracing::info!(
            model_id = bedrock.model_id(),
            region = bedrock.region(),
            model_family = ?bedrock.model_family(),
            explicit_credentials = bedrock.has_explicit_credentials(),
            endpoint_url = bedrock.endpoint_url(),
            "Bedrock client constructed"
        );

        Ok(bedrock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumIs)]
pub enum RunOutcome {
    /// The model answered and the answer was printed
    Completed,
    /// The client was built but prompting it failed
    InvocationFailed,
    /// The client could not be built, nothing was sent
    ConstructionFailed,
}

/// Sends the configured prompt once and prints the result.
#[derive(Debug)]
pub struct InferenceRunner {
    settings: Settings,
    credentials: CredentialRecord,
}

impl InferenceRunner {
    pub fn new(settings: Settings, credentials: CredentialRecord) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Publishes the credentials to the process environment when they are delivered through it.
    /// Returns whether anything was published.
    ///
    /// # Safety
    ///
    /// See [`CredentialRecord::publish_to_env`]: no other thread may access the environment
    /// while this runs.
    #[allow(unsafe_code)]
    pub unsafe fn publish_credentials(&self) -> bool {
        match self.settings.credential_delivery {
            CredentialDelivery::Environment => {
                // SAFETY: upheld by the caller
                unsafe { self.credentials.publish_to_env() };
                true
            }
            CredentialDelivery::Explicit => false,
        }
    }

    fn client_credentials(&self) -> Option<&CredentialRecord> {
        match self.settings.credential_delivery {
            CredentialDelivery::Explicit => Some(&self.credentials),
            CredentialDelivery::Environment => None,
        }
    }

    /// Builds the client, prompts it once and writes the outcome to `out`
    ///
    /// Failures of the model are reported on `out` and reflected in the returned
    /// [`RunOutcome`], they are never returned as errors.
    ///
    /// # Errors
    ///
    /// Only fails if writing to `out` fails.
    #[tracing::instrument(
        skip_all,
        fields(
            profile_id = %self.settings.inference_profile_id,
            region = %self.settings.region
        )
    )]
    pub async fn run<F: ChatModelFactory>(
        &self,
        factory: &F,
        out: &mut impl Write,
    ) -> io::Result<RunOutcome> {
        writeln!(
            out,
            "Initializing Bedrock client with inference profile: {}",
            self.settings.inference_profile_id
        )?;

        let model = match factory.build(&self.settings, self.client_credentials()) {
            Ok(model) => model,
            Err(err) => {
                tracing::error!(error = %err, "Failed to construct chat model client");
                write_error_block(out, "Failed to initialize Bedrock", &err, err.kind())?;
                return Ok(RunOutcome::ConstructionFailed);
            }
        };

        writeln!(out, "Sending request to Amazon Bedrock using inference profile...")?;

        let prompt = Prompt::from(&self.settings.prompt);
        let outcome = match model.prompt(prompt).await {
            Ok(content) => {
                writeln!(out, "\n{RESPONSE_BANNER}")?;
                writeln!(out, "{content}")?;
                writeln!(out, "{RESPONSE_FOOTER}\n")?;
                RunOutcome::Completed
            }
            Err(err) => {
                tracing::error!(error = %err, model = model.name(), "Prompt failed");
                write_error_block(out, "Failed to get response from Bedrock", &err, err.kind())?;
                RunOutcome::InvocationFailed
            }
        };

        writeln!(out, "{COMPLETION_BANNER}")?;

        Ok(outcome)
    }
}

fn write_error_block(
    out: &mut impl Write,
    context: &str,
    error: &dyn fmt::Display,
    kind: &str,
) -> io::Result<()> {
    writeln!(out, "\n{ERROR_BANNER}")?;
    writeln!(out, "{context}: {error}")?;
    writeln!(out, "Error type: {kind}")?;
    writeln!(out, "{ERROR_FOOTER}\n")
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::settings::DEFAULT_PROMPT;
    use hello_bedrock_core::{LanguageModelError, test_utils::MockSimplePrompt};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn runner(settings: Settings) -> InferenceRunner {
        InferenceRunner::new(settings, CredentialRecord::new("AKIA_TEST", "secret123"))
    }

    async fn run_to_string(
        runner: &InferenceRunner,
        factory: &impl ChatModelFactory,
    ) -> (RunOutcome, String) {
        let mut out = Vec::new();
        let outcome = runner.run(factory, &mut out).await.unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    fn mock_factory(
        mock: &MockSimplePrompt,
    ) -> impl Fn(&Settings, Option<&CredentialRecord>) -> Result<MockSimplePrompt, ClientConstructionError>
    {
        let mock = mock.clone();
        move |_: &Settings, _: Option<&CredentialRecord>| -> Result<MockSimplePrompt, ClientConstructionError> {
            Ok(mock.clone())
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_successful_run() {
        let mock = MockSimplePrompt::new();
        mock.expect_prompt(
            "What's the meaning of 'Hello World' in programming?",
            Ok("It is the first program you write.".to_string()),
        );

        let (outcome, output) = run_to_string(&runner(Settings::default()), &mock_factory(&mock)).await;

        assert!(outcome.is_completed());
        assert_eq!(
            output,
            indoc! {"
                Initializing Bedrock client with inference profile: us.meta.llama3-1-8b-instruct-v1:0
                Sending request to Amazon Bedrock using inference profile...

                --- Response from Amazon Bedrock ---
                It is the first program you write.
                -----------------------------------

                Hello World demonstration complete!
            "}
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_invocation_failure_still_completes() {
        let mock = MockSimplePrompt::new();
        mock.expect_prompt(
            "What's the meaning of 'Hello World' in programming?",
            Err(LanguageModelError::transient(anyhow::anyhow!(
                "ThrottlingException: slow down"
            ))),
        );

        let (outcome, output) = run_to_string(&runner(Settings::default()), &mock_factory(&mock)).await;

        assert!(outcome.is_invocation_failed());
        assert_eq!(
            output,
            indoc! {"
                Initializing Bedrock client with inference profile: us.meta.llama3-1-8b-instruct-v1:0
                Sending request to Amazon Bedrock using inference profile...

                --- ERROR ---
                Failed to get response from Bedrock: Transient error: ThrottlingException: slow down
                Error type: TransientError
                ------------

                Hello World demonstration complete!
            "}
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_construction_failure_returns_early() {
        let factory = |_: &Settings, _: Option<&CredentialRecord>| -> Result<MockSimplePrompt, _> {
            Err(ClientConstructionError::invalid("region", "must not be empty"))
        };

        let (outcome, output) = run_to_string(&runner(Settings::default()), &factory).await;

        assert!(outcome.is_construction_failed());
        assert!(output.contains("Failed to initialize Bedrock: invalid client setting `region`"));
        assert!(output.contains("Error type: InvalidSetting"));
        assert!(!output.contains("Sending request"));
        assert!(!output.contains(COMPLETION_BANNER));
    }

    #[test_log::test(tokio::test)]
    async fn test_configured_prompt_is_sent() {
        let mock = MockSimplePrompt::new();
        mock.expect_prompt("Say hi", Ok("hi".to_string()));

        let settings = Settings {
            prompt: "Say hi".to_string(),
            ..Settings::default()
        };
        let (outcome, _) = run_to_string(&runner(settings), &mock_factory(&mock)).await;

        assert!(outcome.is_completed());
        assert_eq!(mock.received(), vec!["Say hi".to_string()]);
    }

    #[test_case::test_case(CredentialDelivery::Explicit, Some("AKIA_TEST") ; "explicit")]
    #[test_case::test_case(CredentialDelivery::Environment, None ; "environment")]
    #[test_log::test(tokio::test)]
    async fn test_credential_delivery(delivery: CredentialDelivery, expected: Option<&str>) {
        let mock = MockSimplePrompt::new();
        mock.expect_prompt(DEFAULT_PROMPT, Ok("ok".to_string()));

        let seen: Arc<Mutex<Option<Option<String>>>> = Arc::new(Mutex::new(None));
        let factory = {
            let seen = seen.clone();
            let mock = mock.clone();
            move |_: &Settings,
                  credentials: Option<&CredentialRecord>|
                  -> Result<MockSimplePrompt, ClientConstructionError> {
                *seen.lock().unwrap() =
                    Some(credentials.map(|c| c.access_key_id().to_string()));
                Ok(mock.clone())
            }
        };

        let settings = Settings {
            credential_delivery: delivery,
            ..Settings::default()
        };
        run_to_string(&runner(settings), &factory).await;

        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.as_deref(), expected);
    }

    #[test_log::test(tokio::test)]
    async fn test_bedrock_factory_rejects_invalid_settings() {
        let settings = Settings {
            temperature: 2.0,
            ..Settings::default()
        };

        let (outcome, output) = run_to_string(&runner(settings), &BedrockFactory).await;

        assert!(outcome.is_construction_failed());
        assert!(output.contains("invalid client setting `temperature`"));
        assert!(!output.contains(COMPLETION_BANNER));
    }

    #[test_log::test(tokio::test)]
    async fn test_bedrock_factory_builds_from_settings() {
        let settings = Settings {
            max_tokens: 64,
            ..Settings::default()
        };

        let bedrock = BedrockFactory
            .build(&settings, Some(&CredentialRecord::new("a", "b")))
            .unwrap();

        assert_eq!(bedrock.model_id(), "us.meta.llama3-1-8b-instruct-v1:0");
        assert_eq!(bedrock.region(), "us-east-2");
        assert_eq!(bedrock.model_config().max_tokens, 64);
        assert_eq!(bedrock.model_config().temperature, 0.7);
        assert!(bedrock.has_explicit_credentials());
        assert_eq!(bedrock.endpoint_url(), None);
    }
}
