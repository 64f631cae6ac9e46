//! Bearer-token providers.
//!
//! The converter never reads an implicit global session. Every component
//! that talks to Google asks an injected [`TokenProvider`] for a token right
//! before the request, so tests can hand in a fixed fake token and long-lived
//! processes can plug in their own refreshing source.

use crate::error::AuthError;
use async_trait::async_trait;
use std::fmt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable read by [`EnvToken::default`].
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_OAUTH_TOKEN";

/// Supplies an OAuth 2.0 access token for the current session.
///
/// Acquisition and refresh policy belong to the implementation.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, typically passed on the command line or used in tests.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        non_empty(self.0.trim().to_string())
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        match std::env::var(&self.var) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(AuthError::MissingEnv {
                var: self.var.clone(),
            }),
        }
    }
}

/// Asks the `gcloud` CLI for the active account's token.
///
/// Runs `gcloud auth print-access-token` per call; gcloud caches and
/// refreshes the underlying credential itself.
#[derive(Debug, Clone)]
pub struct GcloudToken {
    program: String,
}

impl GcloudToken {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }

    /// Use a different executable, e.g. an absolute path to gcloud.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GcloudToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for GcloudToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        let command = format!("{} auth print-access-token", self.program);
        debug!("Requesting access token via `{}`", command);

        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| AuthError::CommandFailed {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AuthError::CommandFailed {
                command,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        non_empty(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn non_empty(token: String) -> Result<String, AuthError> {
    if token.is_empty() {
        Err(AuthError::EmptyToken)
    } else {
        Ok(token)
    }
}
