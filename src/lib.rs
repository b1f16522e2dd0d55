//! anomalyscope -- terminal dashboard for security log-anomaly analysis.
//!
//! Fetches anomaly records from the analysis backend, derives aggregate views
//! and risk tiers, and drives the upload/fetch/render lifecycle with transient
//! notifications.

pub mod analysis;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod notify;
pub mod render;

use std::sync::Arc;

use anyhow::Result;

use crate::api::HttpAnomalyApi;
use crate::config::ScopeConfig;
use crate::dashboard::Dashboard;
use crate::render::RenderSink;

/// Build a dashboard talking to the configured backend.
pub fn connect(config: &ScopeConfig, sink: Box<dyn RenderSink>) -> Result<Dashboard> {
    tracing::info!(backend = %config.backend.base_url, "connecting to analysis backend");
    let api = HttpAnomalyApi::new(&config.backend.base_url, config.backend.timeout())?;
    Ok(Dashboard::new(
        Arc::new(api),
        sink,
        config.notifier(),
        config.engine_options(),
    ))
}
