//! Loading AWS credentials from a local JSON file
//!
//! The file is a JSON object carrying at least the string fields `aws_access_key_id` and
//! `aws_secret_access_key`. Other fields are ignored here.
//!
//! ```json
//! {
//!   "aws_access_key_id": "AKIA...",
//!   "aws_secret_access_key": "..."
//! }
//! ```
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret as _, SecretString};
use serde_json::Value;
use thiserror::Error;

/// Conventional location of the credentials file, relative to the working directory
pub const DEFAULT_CREDENTIALS_FILE: &str = "config.json";

pub const ACCESS_KEY_ID_FIELD: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY_FIELD: &str = "aws_secret_access_key";

pub const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

#[derive(Error, Debug, strum_macros::IntoStaticStr)]
pub enum CredentialLoadError {
    #[error("credentials file {} not found", path.display())]
    NotFound { path: PathBuf, source: io::Error },

    #[error("failed to read credentials file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("credentials file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("credentials file {} is missing required field `{field}`", path.display())]
    MissingField { path: PathBuf, field: &'static str },
}

impl CredentialLoadError {
    /// Category label of the error, as printed next to the message
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// The file that could not be loaded
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingField { path, .. } => path,
        }
    }
}

/// The two secret values needed to authenticate against the hosted model provider.
///
/// Created once from the credentials file and never mutated. The secret access key is kept in a
/// [`SecretString`] and is redacted from `Debug` output.
pub struct CredentialRecord {
    access_key_id: String,
    secret_access_key: SecretString,
}

impl CredentialRecord {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Extracts the credential record from an already parsed credentials document
    ///
    /// # Errors
    ///
    /// Fails with [`CredentialLoadError::MissingField`] if either key is absent (or `null`), and
    /// with [`CredentialLoadError::Parse`] if the document is not an object or a value is not a
    /// string.
    pub fn from_json(path: impl AsRef<Path>, document: &Value) -> Result<Self, CredentialLoadError> {
        let path = path.as_ref();
        let object = document.as_object().ok_or_else(|| CredentialLoadError::Parse {
            path: path.to_path_buf(),
            source: serde::de::Error::custom("expected a JSON object at the top level"),
        })?;

        let field = |name: &'static str| -> Result<String, CredentialLoadError> {
            match object.get(name) {
                None | Some(Value::Null) => Err(CredentialLoadError::MissingField {
                    path: path.to_path_buf(),
                    field: name,
                }),
                Some(Value::String(value)) => Ok(value.clone()),
                Some(other) => Err(CredentialLoadError::Parse {
                    path: path.to_path_buf(),
                    source: serde::de::Error::custom(format!(
                        "field `{name}` must be a string, found {other}"
                    )),
                }),
            }
        };

        Ok(Self::new(
            field(ACCESS_KEY_ID_FIELD)?,
            field(SECRET_ACCESS_KEY_FIELD)?,
        ))
    }

    /// Publishes the credentials as `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` so that the
    /// SDK's environment credential provider can pick them up.
    ///
    /// # Safety
    ///
    /// Mutates the process environment. The caller must ensure no other thread reads or writes
    /// environment variables while this runs, typically by calling it before any runtime or
    /// worker thread is started.
    #[allow(unsafe_code)]
    pub unsafe fn publish_to_env(&self) {
        tracing::debug!(
            access_key_id = %self.access_key_id,
            "Publishing credentials to the process environment"
        );
        // SAFETY: upheld by the caller, see above.
        unsafe {
            std::env::set_var(ACCESS_KEY_ID_ENV, &self.access_key_id);
            std::env::set_var(SECRET_ACCESS_KEY_ENV, self.secret_access_key.expose_secret());
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Reads and parses a JSON document from disk
///
/// The file handle is scoped to this call and released on every path.
///
/// # Errors
///
/// [`CredentialLoadError::NotFound`] if the file does not exist, [`CredentialLoadError::Read`] for
/// any other io failure and [`CredentialLoadError::Parse`] if the contents are not valid JSON.
pub fn read_json(path: impl AsRef<Path>) -> Result<Value, CredentialLoadError> {
    let path = path.as_ref();
    let contents = fs_err::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CredentialLoadError::NotFound {
                path: path.to_path_buf(),
                source,
            }
        } else {
            CredentialLoadError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_slice(&contents).map_err(|source| CredentialLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the credential record from the JSON file at `path`
///
/// # Errors
///
/// See [`read_json`] and [`CredentialRecord::from_json`].
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()), err)]
pub fn load_credentials(path: impl AsRef<Path>) -> Result<CredentialRecord, CredentialLoadError> {
    let document = read_json(&path)?;
    CredentialRecord::from_json(path, &document)
}
