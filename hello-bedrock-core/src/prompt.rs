//! Prompts sent to chat models
//!
//! A [`Prompt`] is something you send to a [`SimplePrompt`][crate::SimplePrompt]. Prompts can be
//! created from anything that implements [`Into<String>`], or from a static string without
//! allocating.
//!
//! # Example
//!
//! ```
//! # use hello_bedrock_core::prompt::Prompt;
//! let prompt: Prompt = "What's the meaning of 'Hello World' in programming?".into();
//!
//! assert_eq!(prompt.render(), "What's the meaning of 'Hello World' in programming?");
//! ```
use std::borrow::Cow;
use std::fmt;

/// A Prompt can be used with large language models to prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    text: Cow<'static, str>,
}

impl Prompt {
    /// Renders the prompt to the text sent to the model
    pub fn render(&self) -> &str {
        &self.text
    }

    /// True if the prompt is empty or only whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&'static str> for Prompt {
    fn from(prompt: &'static str) -> Self {
        Prompt {
            text: Cow::Borrowed(prompt),
        }
    }
}

impl From<String> for Prompt {
    fn from(prompt: String) -> Self {
        Prompt {
            text: Cow::Owned(prompt),
        }
    }
}

impl From<&String> for Prompt {
    fn from(prompt: &String) -> Self {
        Prompt {
            text: Cow::Owned(prompt.clone()),
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
