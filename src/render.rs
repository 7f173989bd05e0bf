// 📊 Result Renderer - total, category breakdown, chart and alerts
//
// The renderer is the only owner of the chart instance. Every render cycle
// destroys the previous chart before drawing the new one.

use crate::alerts::{AlertPolicy, AlertSet};
use crate::totals::CategoryTotals;
use crate::view::{CategoryRow, ChartCanvas, ChartData, ChartSegment, Dashboard};

/// Segment colors, cycled when there are more categories than entries
pub const PALETTE: [&str; 6] = ["#4299e1", "#48bb78", "#ed8936", "#9f7aea", "#f56565", "#718096"];

/// `$` followed by the amount with two decimals
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Uppercase the first character, leave the rest untouched
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Chart segments for every positive category, largest first
pub fn chart_data(totals: &CategoryTotals) -> ChartData {
    let positive = totals.positive();
    let sum: f64 = positive.iter().map(|(_, v)| v).sum();

    let segments = positive
        .into_iter()
        .enumerate()
        .map(|(i, (category, value))| ChartSegment {
            label: capitalize(category),
            value,
            share: if sum > 0.0 { value / sum } else { 0.0 },
            color: PALETTE[i % PALETTE.len()],
        })
        .collect();

    ChartData { segments }
}

pub fn category_rows(totals: &CategoryTotals) -> Vec<CategoryRow> {
    totals
        .positive()
        .into_iter()
        .map(|(category, amount)| CategoryRow {
            label: capitalize(category),
            amount: format_currency(amount),
        })
        .collect()
}

pub struct Renderer<C: ChartCanvas> {
    canvas: C,
    chart: Option<C::Chart>,
    policy: AlertPolicy,
}

impl<C: ChartCanvas> Renderer<C> {
    pub fn new(canvas: C, policy: AlertPolicy) -> Self {
        Renderer {
            canvas,
            chart: None,
            policy,
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn chart(&self) -> Option<&C::Chart> {
        self.chart.as_ref()
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    /// Render one successful response onto the dashboard
    pub fn render(&mut self, totals: &CategoryTotals, dashboard: &mut dyn Dashboard) -> AlertSet {
        dashboard.set_results_visible(true);
        dashboard.set_total(format_currency(totals.total()));
        dashboard.replace_categories(category_rows(totals));

        self.redraw_chart(&chart_data(totals));

        let alerts = self.policy.evaluate(totals);
        dashboard.replace_alerts(alerts.rows());
        alerts
    }

    fn redraw_chart(&mut self, data: &ChartData) {
        if let Some(previous) = self.chart.take() {
            self.canvas.destroy(previous);
        }
        self.chart = Some(self.canvas.create(data));
    }

    /// Release the current chart, if any
    pub fn clear_chart(&mut self) {
        if let Some(previous) = self.chart.take() {
            self.canvas.destroy(previous);
        }
    }
}

impl<C: ChartCanvas> Drop for Renderer<C> {
    fn drop(&mut self) {
        self.clear_chart();
    }
}

// ============================================================================
// TESTS
// ============================================================================
