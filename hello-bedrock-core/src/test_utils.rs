#![allow(clippy::missing_panics_doc)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crate::{SimplePrompt, errors::LanguageModelError, prompt::Prompt};

type Expectations = Arc<Mutex<Vec<(String, Result<String, LanguageModelError>)>>>;
type Received = Arc<Mutex<Vec<(String, Result<String, String>)>>>;

/// A [`SimplePrompt`] that answers from a queue of expectations.
///
/// Every expected prompt must be received exactly once, in order. Unmet expectations panic when
/// the last clone is dropped.
#[derive(Clone, Debug)]
pub struct MockSimplePrompt {
    expectations: Expectations,
    received_expectations: Received,
}

impl Default for MockSimplePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSimplePrompt {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            received_expectations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_prompt(
        &self,
        prompt: impl Into<String>,
        response: Result<String, LanguageModelError>,
    ) {
        let mut mutex = self.expectations.lock().unwrap();

        mutex.insert(0, (prompt.into(), response));
    }

    /// Prompts received so far
    pub fn received(&self) -> Vec<String> {
        self.received_expectations
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl SimplePrompt for MockSimplePrompt {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        let (expected_prompt, response) =
            self.expectations.lock().unwrap().pop().unwrap_or_else(|| {
                panic!("Received prompt, but no expectations are set\n {prompt}")
            });

        assert_eq!(expected_prompt, prompt.render(), "Unexpected prompt");

        let logged = match &response {
            Ok(text) => Ok(text.clone()),
            Err(err) => Err(err.to_string()),
        };
        self.received_expectations
            .lock()
            .unwrap()
            .push((expected_prompt, logged));

        response
    }
}

impl Drop for MockSimplePrompt {
    fn drop(&mut self) {
        // We are still cloned, so do not check assertions yet
        if Arc::strong_count(&self.received_expectations) > 1 {
            return;
        }
        let Ok(expectations) = self.expectations.lock() else {
            return;
        };
        let Ok(received) = self.received_expectations.lock() else {
            return;
        };

        if expectations.is_empty() {
            let num_received = received.len();
            tracing::debug!("[MockSimplePrompt] All {num_received} expectations were met");
        } else {
            let pending = expectations
                .iter()
                .map(|(prompt, _)| prompt.as_str())
                .collect::<Vec<_>>()
                .join("\n---\n");

            panic!("[MockSimplePrompt] Not all expectations were met\n pending:\n{pending}");
        }
    }
}
