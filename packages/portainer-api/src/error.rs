//! Error types
//!
//! Every failure a deployment run can hit, grouped by the phase that raises it.

use std::path::PathBuf;

use reqwest::Method;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid input (address, stack name, environment entry...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server could not be reached at all
    #[error("cannot reach Portainer server at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    /// Bad credentials or a malformed authentication response
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: &'static str, name: String },

    /// Non-success status, transport or decode failure on an authenticated call
    #[error("Portainer API error: {method} {url} {reason}")]
    Api {
        method: Method,
        url: String,
        reason: String,
    },

    /// Stack creation rejected by the server
    #[error("failed to deploy stack \"{stack}\": {reason}")]
    Deploy { stack: String, reason: String },

    /// Stack update rejected by the server
    #[error("failed to update stack \"{stack}\": {reason}")]
    Update { stack: String, reason: String },

    /// A stack with the same name is already registered on another endpoint
    #[error("stack \"{stack}\" already exists on endpoint {existing_endpoint}, refusing to create it on endpoint {endpoint}")]
    Conflict {
        stack: String,
        existing_endpoint: i64,
        endpoint: i64,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn api(method: Method, url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Api {
            method,
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by local input rather than the server
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
