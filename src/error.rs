//! Error types shared by the runtime and gateway collaborators.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the container runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Error reported by the Docker API client.
    #[error("docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// The runtime could not serve the request.
    #[error("container runtime unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RuntimeError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Failures talking to the Kong admin API.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid gateway URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request never produced a response.
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a status >= 400.
    #[error("{context}: {status}")]
    Status { status: StatusCode, context: String },

    /// The response body was not the expected JSON.
    #[error("unable to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn status(status: StatusCode, context: impl Into<String>) -> Self {
        Self::Status {
            status,
            context: context.into(),
        }
    }
}

/// Failures of a synchronization step.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
