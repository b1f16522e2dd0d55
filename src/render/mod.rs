//! Render sinks -- the collaborators that draw a snapshot.

pub mod json;
pub mod terminal;

use std::io;

use crate::analysis::aggregator::HOURS_PER_DAY;
use crate::analysis::risk::sort_rows;
use crate::analysis::{AggregateView, ClassifiedRecord, SortKey};
use crate::dashboard::Snapshot;

pub use self::json::JsonSink;
pub use self::terminal::TerminalSink;

/// Receives one snapshot's derived data. Implementations only draw; they never
/// compute or keep aggregate state between renders.
pub trait RenderSink: Send {
    fn render_summary(&mut self, view: &AggregateView) -> io::Result<()>;
    /// Per-type distribution, read from `view.type_histogram`.
    fn render_type_chart(&mut self, view: &AggregateView) -> io::Result<()>;
    fn render_time_chart(&mut self, histogram: &[usize; HOURS_PER_DAY]) -> io::Result<()>;
    fn render_table(&mut self, rows: &[ClassifiedRecord]) -> io::Result<()>;

    /// Called once after the four parts of a render.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Table presentation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    pub sort: SortKey,
    /// `None` shows every row.
    pub limit: Option<usize>,
}

/// Push every part of one snapshot through `sink`.
pub fn render_snapshot(
    sink: &mut dyn RenderSink,
    snapshot: &Snapshot,
    options: TableOptions,
) -> io::Result<()> {
    sink.render_summary(&snapshot.view)?;
    sink.render_type_chart(&snapshot.view)?;
    sink.render_time_chart(&snapshot.view.hour_histogram)?;

    let mut rows = snapshot.records.clone();
    sort_rows(&mut rows, options.sort);
    if let Some(limit) = options.limit {
        rows.truncate(limit);
    }
    sink.render_table(&rows)?;

    sink.finish()
}
