//! Error types for engine access and the update workflow.

use std::fmt;

use thiserror::Error;

/// Failure reported by a [`ContainerEngine`](crate::docker::ContainerEngine) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("engine API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error;

        match err {
            Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::NotFound(message),
            Error::DockerResponseServerError {
                status_code,
                message,
            } => Self::Api {
                status: status_code,
                message,
            },
            Error::DockerStreamError { error } => Self::Api {
                status: 500,
                message: error,
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Image pull failures. Each variant carries the `repository:tag` it concerns.
#[derive(Debug, Error)]
pub enum PullError {
    #[error("Image '{0}' not found.")]
    ImageNotFound(String),
    #[error("Failed to pull image {0}: {1}")]
    Api(String, String),
    #[error("An unexpected error occurred while pulling image {0}: {1}")]
    Unexpected(String, String),
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Failed to list containers: {0}")]
    ListFailed(String),
}

/// Step of the recreation sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecreateStage {
    Snapshot,
    Stop,
    Remove,
    Create,
    Start,
}

impl fmt::Display for RecreateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Snapshot => "snapshot",
            Self::Stop => "stop",
            Self::Remove => "remove",
            Self::Create => "create",
            Self::Start => "start",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct RecreateError {
    pub stage: RecreateStage,
    #[source]
    pub source: EngineError,
}

impl RecreateError {
    pub fn at(stage: RecreateStage) -> impl FnOnce(EngineError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Failures that end an update request before any container is touched.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Pull(#[from] PullError),
    #[error(transparent)]
    Locate(#[from] LocateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_404_maps_to_not_found() {
        let err: EngineError = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "manifest unknown".to_string(),
        }
        .into();
        assert_eq!(err, EngineError::NotFound("manifest unknown".to_string()));
    }

    #[test]
    fn stream_error_maps_to_api() {
        let err: EngineError = bollard::errors::Error::DockerStreamError {
            error: "connection reset".to_string(),
        }
        .into();
        assert_eq!(err, EngineError::api(500, "connection reset"));
    }

    #[test]
    fn recreate_error_names_stage() {
        let err = RecreateError::at(RecreateStage::Create)(EngineError::api(409, "name in use"));
        assert_eq!(
            err.to_string(),
            "create failed: engine API error (HTTP 409): name in use"
        );
    }
}
