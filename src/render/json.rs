//! One JSON document per render, for scripting.

use std::io::{self, Write};

use serde_json::{json, Map, Value};

use super::RenderSink;
use crate::analysis::aggregator::HOURS_PER_DAY;
use crate::analysis::{AggregateView, ClassifiedRecord};

pub struct JsonSink<W: Write + Send> {
    out: W,
    pending: Map<String, Value>,
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: Map::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn put(&mut self, key: &str, value: impl serde::Serialize) -> io::Result<()> {
        let value = serde_json::to_value(value).map_err(io::Error::other)?;
        self.pending.insert(key.to_string(), value);
        Ok(())
    }
}

impl<W: Write + Send> RenderSink for JsonSink<W> {
    fn render_summary(&mut self, view: &AggregateView) -> io::Result<()> {
        self.put(
            "summary",
            json!({
                "total_count": view.total_count,
                "unique_user_count": view.unique_user_count,
                "latest_timestamp": view.latest_timestamp,
            }),
        )
    }

    fn render_type_chart(&mut self, view: &AggregateView) -> io::Result<()> {
        self.put("type_histogram", &view.type_histogram)
    }

    fn render_time_chart(&mut self, histogram: &[usize; HOURS_PER_DAY]) -> io::Result<()> {
        self.put("hour_histogram", histogram.as_slice())
    }

    fn render_table(&mut self, rows: &[ClassifiedRecord]) -> io::Result<()> {
        self.put("records", rows)
    }

    fn finish(&mut self) -> io::Result<()> {
        let document = Value::Object(std::mem::take(&mut self.pending));
        serde_json::to_writer_pretty(&mut self.out, &document).map_err(io::Error::other)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::model::{parse_timestamp, AnomalyRecord};

    #[test]
    fn test_document_shape() {
        let records = vec![AnomalyRecord {
            user_id: "u-1".to_string(),
            timestamp: parse_timestamp("2024-03-09T17:05:00").unwrap(),
            action: "delete".to_string(),
            resource: "/db/users".to_string(),
            ip_address: "192.0.2.44".to_string(),
            anomaly_type: "High Access Frequency".to_string(),
            score: 0.45,
        }];
        let view = aggregate(&records);
        let rows: Vec<_> = records.into_iter().map(ClassifiedRecord::new).collect();

        let mut sink = JsonSink::new(Vec::new());
        sink.render_summary(&view).unwrap();
        sink.render_type_chart(&view).unwrap();
        sink.render_time_chart(&view.hour_histogram).unwrap();
        sink.render_table(&rows).unwrap();
        sink.finish().unwrap();

        let doc: Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(doc["summary"]["total_count"], 1);
        assert_eq!(doc["summary"]["latest_timestamp"], "2024-03-09T17:05:00");
        assert_eq!(doc["type_histogram"]["High Access Frequency"], 1);
        assert_eq!(doc["hour_histogram"].as_array().unwrap().len(), 24);
        assert_eq!(doc["hour_histogram"][17], 1);
        assert_eq!(doc["records"][0]["tier"], "medium");
        assert_eq!(doc["records"][0]["user_id"], "u-1");
    }
}
