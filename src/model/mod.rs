//! Anomaly records exchanged with the analysis backend.
//!
//! Records arrive as [`RawAnomalyRecord`] (exactly what `GET /anomalies`
//! serializes) and are validated into immutable [`AnomalyRecord`] values before
//! anything downstream sees them.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Naive layouts the backend is known to emit (Python `isoformat()` and the
/// space-separated SQL form).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record has an empty user_id")]
    EmptyUserId,
    #[error("record for user '{user_id}' has unparseable timestamp '{value}'")]
    InvalidTimestamp { user_id: String, value: String },
    #[error("record for user '{user_id}' has a NaN score")]
    ScoreNotANumber { user_id: String },
}

/// One anomaly as serialized by the backend. Nullable columns come through as
/// empty strings; required fields stay optional here so validation can name
/// what is missing instead of failing the whole array decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnomalyRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resource: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub anomaly_type: String,
    #[serde(default)]
    pub score: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A validated anomaly. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub user_id: String,
    /// Wall-clock time in the viewer's local zone.
    pub timestamp: NaiveDateTime,
    pub action: String,
    pub resource: String,
    pub ip_address: String,
    pub anomaly_type: String,
    /// Lower is riskier.
    pub score: f64,
}

impl AnomalyRecord {
    /// Hour of day (0-23) used for the hourly histogram.
    pub fn hour(&self) -> usize {
        self.timestamp.hour() as usize
    }
}

impl TryFrom<RawAnomalyRecord> for AnomalyRecord {
    type Error = RecordError;

    fn try_from(raw: RawAnomalyRecord) -> Result<Self, Self::Error> {
        let user_id = raw.user_id.ok_or(RecordError::MissingField("user_id"))?;
        if user_id.trim().is_empty() {
            return Err(RecordError::EmptyUserId);
        }

        let value = raw.timestamp.ok_or(RecordError::MissingField("timestamp"))?;
        let timestamp = parse_timestamp(&value).ok_or_else(|| RecordError::InvalidTimestamp {
            user_id: user_id.clone(),
            value: value.clone(),
        })?;

        let score = raw.score.ok_or(RecordError::MissingField("score"))?;
        if score.is_nan() {
            return Err(RecordError::ScoreNotANumber { user_id });
        }

        Ok(Self {
            user_id,
            timestamp,
            action: raw.action,
            resource: raw.resource,
            ip_address: raw.ip_address,
            anomaly_type: raw.anomaly_type,
            score,
        })
    }
}

/// Parse a backend timestamp into local wall-clock time.
///
/// Offset-bearing RFC 3339 values are converted into the local zone; naive
/// values are taken as already local, the same way a browser reads them.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
