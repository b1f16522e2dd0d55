use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use super::{AnomalyApi, UploadReceipt, UploadResponse};
use crate::error::DashboardError;
use crate::model::RawAnomalyRecord;

/// reqwest client for the analysis backend.
#[derive(Debug, Clone)]
pub struct HttpAnomalyApi {
    client: Client,
    base: Url,
}

impl HttpAnomalyApi {
    /// `timeout` of `None` means requests may hang indefinitely; only the
    /// loading indicator of that action is affected.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base = normalize_base(base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, DashboardError> {
        self.base
            .join(path)
            .map_err(|e| DashboardError::Transport(format!("bad endpoint '{}': {}", path, e)))
    }

    /// Download the backend export verbatim. The body is never parsed unless
    /// the backend signals an error.
    pub async fn export(&self, format: &str) -> Result<Vec<u8>, DashboardError> {
        let url = export_url(&self.base, format)?;
        info!(%url, "requesting export");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<UploadResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("export failed with HTTP {}", status));
            return Err(DashboardError::Remote(message));
        }

        debug!(bytes = body.len(), "export downloaded");
        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl AnomalyApi for HttpAnomalyApi {
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, DashboardError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DashboardError::Validation("Please select a file first.".to_string()))?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DashboardError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let url = self.endpoint("upload")?;
        info!(%url, file = %file_name, bytes = bytes.len(), "uploading log file");

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: UploadResponse = serde_json::from_slice(&body)?;
        if !status.is_success() && parsed.error.is_none() {
            warn!(%status, "upload returned an error status without an error field");
        }
        parsed.into_result()
    }

    async fn fetch_anomalies(&self) -> Result<Vec<RawAnomalyRecord>, DashboardError> {
        let url = self.endpoint("anomalies")?;
        debug!(%url, "fetching anomalies");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Transport(format!(
                "GET /anomalies returned HTTP {}",
                status
            )));
        }

        let body = response.bytes().await?;
        let records: Vec<RawAnomalyRecord> = serde_json::from_slice(&body)?;
        info!(count = records.len(), "fetched anomalies");
        Ok(records)
    }
}

/// `GET /export?format=<fmt>`; `format` is passed through opaquely.
pub fn export_url(base: &Url, format: &str) -> Result<Url, DashboardError> {
    let mut url = base
        .join("export")
        .map_err(|e| DashboardError::Transport(format!("bad export endpoint: {}", e)))?;
    url.query_pairs_mut().append_pair("format", format);
    Ok(url)
}

/// Ensure the base path ends in `/` so endpoint joins keep any path prefix.
fn normalize_base(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim())
        .with_context(|| format!("invalid backend URL: {}", base_url))?;
    if base.cannot_be_a_base() {
        anyhow::bail!("backend URL cannot be used as a base: {}", base_url);
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_path_prefix() {
        let api = HttpAnomalyApi::new("http://10.1.2.3:5000/dash", None).unwrap();
        assert_eq!(api.base_url().as_str(), "http://10.1.2.3:5000/dash/");
        assert_eq!(
            api.endpoint("anomalies").unwrap().as_str(),
            "http://10.1.2.3:5000/dash/anomalies"
        );
    }

    #[test]
    fn test_export_url_encodes_format() {
        let base = normalize_base("http://localhost:5000").unwrap();
        assert_eq!(
            export_url(&base, "csv").unwrap().as_str(),
            "http://localhost:5000/export?format=csv"
        );
        assert_eq!(
            export_url(&base, "a b&c").unwrap().as_str(),
            "http://localhost:5000/export?format=a+b%26c"
        );
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(HttpAnomalyApi::new("not a url", None).is_err());
        assert!(HttpAnomalyApi::new("mailto:ops@example.com", None).is_err());
    }
}
