// 🗂️ Dashboard Model - in-memory surfaces shared by the CLI report and the TUI

use crate::view::{AlertRow, CategoryRow, ChartCanvas, ChartData, Dashboard, FileRow};
use serde::Serialize;
use std::fmt::Write as _;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardModel {
    pub files: Vec<FileRow>,
    pub loading: bool,
    pub results_visible: bool,
    pub total: String,
    pub categories: Vec<CategoryRow>,
    pub alerts: Vec<AlertRow>,
}

impl Dashboard for DashboardModel {
    fn replace_files(&mut self, rows: Vec<FileRow>) {
        self.files = rows;
    }

    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
    }

    fn set_results_visible(&mut self, visible: bool) {
        self.results_visible = visible;
    }

    fn set_total(&mut self, text: String) {
        self.total = text;
    }

    fn replace_categories(&mut self, rows: Vec<CategoryRow>) {
        self.categories = rows;
    }

    fn replace_alerts(&mut self, rows: Vec<AlertRow>) {
        self.alerts = rows;
    }
}

impl DashboardModel {
    /// Plain-text rendering of everything currently visible
    pub fn report(&self, chart: Option<&ChartData>) -> String {
        let mut out = String::new();

        if !self.files.is_empty() {
            let _ = writeln!(out, "📂 Files");
            for row in &self.files {
                let _ = writeln!(out, "   {} {}", row.icon, row.name);
            }
            out.push('\n');
        }

        if self.loading {
            let _ = writeln!(out, "⏳ Processing bills...");
        }

        if !self.results_visible {
            return out;
        }

        if !self.total.is_empty() {
            let _ = writeln!(out, "💰 Total: {}", self.total);
            out.push('\n');
        }

        if !self.categories.is_empty() {
            let _ = writeln!(out, "🏷️  Categories");
            let width = self.categories.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
            for row in &self.categories {
                let _ = writeln!(out, "   {:<width$}  {:>12}", row.label, row.amount, width = width);
            }
            out.push('\n');
        }

        if let Some(chart) = chart.filter(|c| !c.is_empty()) {
            let _ = writeln!(out, "📊 Breakdown");
            let width = chart.segments.iter().map(|s| s.label.chars().count()).max().unwrap_or(0);
            for segment in &chart.segments {
                let filled = (segment.share * BAR_WIDTH as f64).round() as usize;
                let _ = writeln!(
                    out,
                    "   {:<width$}  {:<bar$}  {:>5.1}%",
                    segment.label,
                    "█".repeat(filled),
                    segment.share * 100.0,
                    width = width,
                    bar = BAR_WIDTH
                );
            }
            out.push('\n');
        }

        if !self.alerts.is_empty() {
            let _ = writeln!(out, "🚨 Alerts");
            for alert in &self.alerts {
                let marker = match alert {
                    AlertRow::Warning(_) => "⚠️ ",
                    AlertRow::Notice(_) => "✓",
                };
                let _ = writeln!(out, "   {} {}", marker, alert.text());
            }
        }

        out
    }
}

// ============================================================================
// SEGMENT CANVAS
// ============================================================================

/// Canvas whose chart instance is the segment data itself.
/// Keeps count of created and destroyed instances.
#[derive(Debug, Default)]
pub struct SegmentCanvas {
    created: usize,
    destroyed: usize,
}

impl SegmentCanvas {
    pub fn created(&self) -> usize {
        self.created
    }

    /// Instances created and not yet destroyed
    pub fn live(&self) -> usize {
        self.created - self.destroyed
    }
}

impl ChartCanvas for SegmentCanvas {
    type Chart = ChartData;

    fn create(&mut self, data: &ChartData) -> ChartData {
        self.created += 1;
        data.clone()
    }

    fn destroy(&mut self, _chart: ChartData) {
        self.destroyed += 1;
    }
}
