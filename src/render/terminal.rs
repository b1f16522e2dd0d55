//! Plain-text dashboard for a terminal.

use std::io::{self, Write};

use super::RenderSink;
use crate::analysis::aggregator::HOURS_PER_DAY;
use crate::analysis::{AggregateView, ClassifiedRecord};

const BAR_WIDTH: usize = 30;
const RISK_BAR_WIDTH: usize = 10;

pub struct TerminalSink<W: Write + Send> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn bar(count: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * width + max - 1) / max;
    "#".repeat(len)
}

fn risk_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * RISK_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(RISK_BAR_WIDTH);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(RISK_BAR_WIDTH - filled))
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn render_summary(&mut self, view: &AggregateView) -> io::Result<()> {
        let latest = view
            .latest_timestamp
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());

        writeln!(self.out, "\n=== Anomaly Summary ===")?;
        writeln!(self.out, "Total anomalies:  {}", view.total_count)?;
        writeln!(self.out, "Unique users:     {}", view.unique_user_count)?;
        writeln!(self.out, "Latest detection: {}", latest)?;
        if let Some(hour) = view.peak_hour() {
            writeln!(self.out, "Peak hour:        {:02}:00", hour)?;
        }
        Ok(())
    }

    fn render_type_chart(&mut self, view: &AggregateView) -> io::Result<()> {
        writeln!(self.out, "\n=== Anomaly Distribution ===")?;
        if view.type_histogram.is_empty() {
            writeln!(self.out, "(no anomalies)")?;
            return Ok(());
        }

        let max = view.type_histogram.values().copied().max().unwrap_or(0);
        for (kind, count) in &view.type_histogram {
            writeln!(
                self.out,
                "{:<28} | {:>5} | {:>5.1}% | {}",
                kind,
                count,
                view.type_share(kind),
                bar(*count, max, BAR_WIDTH)
            )?;
        }
        Ok(())
    }

    fn render_time_chart(&mut self, histogram: &[usize; HOURS_PER_DAY]) -> io::Result<()> {
        writeln!(self.out, "\n=== Anomalies by Hour of Day ===")?;
        let max = histogram.iter().copied().max().unwrap_or(0);
        for (hour, count) in histogram.iter().enumerate() {
            writeln!(
                self.out,
                "{:02} | {:>5} | {}",
                hour,
                count,
                bar(*count, max, BAR_WIDTH)
            )?;
        }
        Ok(())
    }

    fn render_table(&mut self, rows: &[ClassifiedRecord]) -> io::Result<()> {
        writeln!(self.out, "\n=== Detected Anomalies ===")?;
        if rows.is_empty() {
            writeln!(self.out, "No anomalies found.")?;
            return Ok(());
        }

        writeln!(
            self.out,
            "{:<16} | {:<19} | {:<14} | {:<20} | {:<15} | {:<6} | {:<24} | Score",
            "User", "Time", "Action", "Resource", "IP", "Risk", "Type"
        )?;
        writeln!(
            self.out,
            "{:-<16}-|-{:-<19}-|-{:-<14}-|-{:-<20}-|-{:-<15}-|-{:-<6}-|-{:-<24}-|-{:-<20}",
            "", "", "", "", "", "", "", ""
        )?;
        for row in rows {
            let r = &row.record;
            writeln!(
                self.out,
                "{:<16} | {:<19} | {:<14} | {:<20} | {:<15} | {:<6} | {:<24} | {} {:.3}",
                r.user_id,
                r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                r.action,
                r.resource,
                r.ip_address,
                row.tier.label(),
                r.anomaly_type,
                risk_bar(row.fill_percentage()),
                r.score
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
