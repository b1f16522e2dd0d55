use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::{aggregate, AggregateView, ClassifiedRecord};
use crate::error::DashboardError;
use crate::model::{AnomalyRecord, RawAnomalyRecord};

/// What to do with a record that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Drop the record and keep the rest.
    #[default]
    Skip,
    /// Fail the whole fetch.
    Fail,
}

/// One complete, immutable fetch result. Built in full before it replaces
/// the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Request sequence number that produced this snapshot.
    pub request: u64,
    pub records: Vec<ClassifiedRecord>,
    pub view: AggregateView,
    /// Records dropped under [`MalformedPolicy::Skip`].
    pub rejected: usize,
}

impl Snapshot {
    pub fn build(
        request: u64,
        raw: Vec<RawAnomalyRecord>,
        policy: MalformedPolicy,
    ) -> Result<Self, DashboardError> {
        let mut records = Vec::with_capacity(raw.len());
        let mut rejected = 0;

        for (index, item) in raw.into_iter().enumerate() {
            match AnomalyRecord::try_from(item) {
                Ok(record) => records.push(record),
                Err(err) => match policy {
                    MalformedPolicy::Fail => return Err(err.into()),
                    MalformedPolicy::Skip => {
                        warn!(index, error = %err, "rejecting malformed anomaly record");
                        rejected += 1;
                    }
                },
            }
        }

        let view = aggregate(&records);
        let records = records.into_iter().map(ClassifiedRecord::new).collect();

        Ok(Self {
            request,
            records,
            view,
            rejected,
        })
    }
}
