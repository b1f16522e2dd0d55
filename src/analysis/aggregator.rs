use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::AnomalyRecord;

pub const HOURS_PER_DAY: usize = 24;

/// Derived statistics for one record snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub total_count: usize,
    pub unique_user_count: usize,
    pub latest_timestamp: Option<NaiveDateTime>,
    /// Anomaly type -> occurrences. Only types present in the snapshot.
    pub type_histogram: BTreeMap<String, usize>,
    /// Index = hour of day.
    pub hour_histogram: [usize; HOURS_PER_DAY],
}

impl Default for AggregateView {
    fn default() -> Self {
        Self {
            total_count: 0,
            unique_user_count: 0,
            latest_timestamp: None,
            type_histogram: BTreeMap::new(),
            hour_histogram: [0; HOURS_PER_DAY],
        }
    }
}

impl AggregateView {
    /// Share of the total for one anomaly type, as a percentage.
    pub fn type_share(&self, anomaly_type: &str) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let count = self.type_histogram.get(anomaly_type).copied().unwrap_or(0);
        count as f64 / self.total_count as f64 * 100.0
    }

    /// Busiest hour, or `None` when there are no records.
    pub fn peak_hour(&self) -> Option<usize> {
        if self.total_count == 0 {
            return None;
        }
        self.hour_histogram
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(hour, _)| hour)
    }
}

/// Compute every derived view from one full snapshot of records.
pub fn aggregate(records: &[AnomalyRecord]) -> AggregateView {
    let mut users: HashSet<&str> = HashSet::new();
    let mut view = AggregateView {
        total_count: records.len(),
        ..AggregateView::default()
    };

    for record in records {
        users.insert(record.user_id.as_str());

        *view
            .type_histogram
            .entry(record.anomaly_type.clone())
            .or_insert(0) += 1;

        view.hour_histogram[record.hour()] += 1;

        view.latest_timestamp = match view.latest_timestamp {
            Some(latest) if latest >= record.timestamp => Some(latest),
            _ => Some(record.timestamp),
        };
    }

    view.unique_user_count = users.len();
    view
}
