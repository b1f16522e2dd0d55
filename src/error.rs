//! Failure taxonomy for dashboard actions.

use serde::Serialize;
use thiserror::Error;

use crate::model::RecordError;

/// Everything that can end a user action unsuccessfully. All of these are
/// caught at the dashboard boundary and turned into a single `danger`
/// notification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// Nothing (usable) was selected for upload.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with a structured `error` field.
    #[error("{0}")]
    Remote(String),
    /// Network failure, or a response body that could not be decoded.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A fetched record failed validation.
    #[error("malformed anomaly data: {0}")]
    Data(#[from] RecordError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Validation,
    Remote,
    Transport,
    Data,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::Remote => write!(f, "remote"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Data => write!(f, "data"),
        }
    }
}

impl DashboardError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DashboardError::Validation(_) => FailureKind::Validation,
            DashboardError::Remote(_) => FailureKind::Remote,
            DashboardError::Transport(_) => FailureKind::Transport,
            DashboardError::Data(_) => FailureKind::Data,
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Transport(format!("invalid response body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_messages() {
        let remote = DashboardError::Remote("bad file".to_string());
        assert_eq!(remote.kind(), FailureKind::Remote);
        assert_eq!(remote.to_string(), "bad file");

        let data: DashboardError = RecordError::EmptyUserId.into();
        assert_eq!(data.kind(), FailureKind::Data);
        assert!(data.to_string().contains("empty user_id"));

        let bad_json = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let transport: DashboardError = bad_json.into();
        assert_eq!(transport.kind(), FailureKind::Transport);
        assert_eq!(FailureKind::Transport.to_string(), "transport");
    }
}
