// 🪟 View Collaborators
// The UI surfaces the pipeline writes to. Components receive these explicitly;
// nothing reaches for a global.

use serde::Serialize;

/// Icon shown next to every accepted file
pub const FILE_ICON: &str = "🧾";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    pub icon: &'static str,
    pub name: String,
}

impl FileRow {
    pub fn new(name: impl Into<String>) -> Self {
        FileRow {
            icon: FILE_ICON,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    /// Capitalized category name
    pub label: String,
    /// Currency-formatted amount, e.g. `$30.00`
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlertRow {
    /// Highlighted entry: a spend alert or an error/warning message
    Warning(String),
    /// Plain informational entry
    Notice(String),
}

impl AlertRow {
    pub fn text(&self) -> &str {
        match self {
            AlertRow::Warning(text) | AlertRow::Notice(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSegment {
    pub label: String,
    pub value: f64,
    /// Fraction of the chart total, in `0.0..=1.0`
    pub share: f64,
    /// Hex color from the fixed palette
    pub color: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub segments: Vec<ChartSegment>,
}

impl ChartData {
    pub fn labels(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Display surfaces driven by the pipeline. Every `set_*`/`replace_*` call
/// clears the previous content of that surface.
pub trait Dashboard: Send {
    fn replace_files(&mut self, rows: Vec<FileRow>);
    fn set_loading(&mut self, visible: bool);
    fn set_results_visible(&mut self, visible: bool);
    fn set_total(&mut self, text: String);
    fn replace_categories(&mut self, rows: Vec<CategoryRow>);
    fn replace_alerts(&mut self, rows: Vec<AlertRow>);

    /// Show a single message in the shared alert area
    fn show_alert(&mut self, message: &str) {
        self.replace_alerts(vec![AlertRow::Warning(message.to_string())]);
        self.set_results_visible(true);
    }
}

/// Chart backend. Charts are created from data and must be destroyed
/// explicitly by whoever owns them.
pub trait ChartCanvas: Send {
    type Chart: Send;

    fn create(&mut self, data: &ChartData) -> Self::Chart;
    fn destroy(&mut self, chart: Self::Chart);
}
