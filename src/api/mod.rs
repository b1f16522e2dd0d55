//! Boundary to the backend analysis service.

pub mod http;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::model::RawAnomalyRecord;

pub use self::http::{export_url, HttpAnomalyApi};

/// Body of a `POST /upload` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub anomalies_count: Option<u64>,
}

/// A successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub anomalies_count: Option<u64>,
}

impl UploadResponse {
    /// A non-empty `error` is a failure whatever the HTTP status was.
    pub fn into_result(self) -> Result<UploadReceipt, DashboardError> {
        match self.error {
            Some(error) if !error.trim().is_empty() => Err(DashboardError::Remote(error)),
            _ => Ok(UploadReceipt {
                anomalies_count: self.anomalies_count,
            }),
        }
    }
}

/// The two round trips the dashboard performs.
#[async_trait::async_trait]
pub trait AnomalyApi: Send + Sync {
    /// Upload a log file for analysis.
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, DashboardError>;

    /// Fetch every stored anomaly.
    async fn fetch_anomalies(&self) -> Result<Vec<RawAnomalyRecord>, DashboardError>;
}
