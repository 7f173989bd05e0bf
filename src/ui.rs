use anyhow::Result;
use bill_tally::{
    parse_dropped_paths, AlertRow, CandidateFile, ChartData, DashboardModel, Pipeline, PipelineState,
    SegmentCanvas,
};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::PoisonError;
use std::time::Duration;
use tokio::runtime::Handle;

pub type DashboardPipeline = Pipeline<DashboardModel, SegmentCanvas>;

const TICK: Duration = Duration::from_millis(100);

pub struct App {
    pipeline: DashboardPipeline,
    runtime: Handle,
    /// Paths typed into the file input
    pub input: String,
    /// Number of submissions started from this session
    pub submissions: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(pipeline: DashboardPipeline, runtime: Handle) -> Self {
        Self {
            pipeline,
            runtime,
            input: String::new(),
            submissions: 0,
            should_quit: false,
        }
    }

    /// Start a pipeline run for the given paths. Runs are never awaited here;
    /// a newer run simply supersedes any run still in flight.
    pub fn submit_paths(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }

        let files: Vec<CandidateFile> = paths.iter().map(CandidateFile::from_path).collect();
        let pipeline = self.pipeline.clone();
        self.submissions += 1;

        self.runtime.spawn(async move {
            let outcome = pipeline.submit(files).await;
            tracing::debug!("Run finished: {:?}", outcome);
        });
    }

    /// Files dropped onto the terminal arrive as pasted text
    pub fn handle_drop(&mut self, text: &str) {
        self.submit_paths(parse_dropped_paths(text));
    }

    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.submit_paths(parse_dropped_paths(&text));
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.should_quit = true,
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => self.input.clear(),
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code, key.modifiers),
            Event::Paste(text) => app.handle_drop(&text),
            _ => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let surface = app.pipeline.surface();
    let surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
    let dashboard = &surface.dashboard;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], dashboard, surface.state);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Drop zone
            Constraint::Length(3), // File input
            Constraint::Min(0),    // File list
        ])
        .split(columns[0]);

    render_drop_zone(f, left[0]);
    render_file_input(f, left[1], app);
    render_file_list(f, left[2], dashboard);

    if dashboard.results_visible {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),      // Total
                Constraint::Percentage(30), // Categories
                Constraint::Percentage(40), // Chart
                Constraint::Min(0),         // Alerts
            ])
            .split(columns[1]);

        render_total(f, right[0], dashboard);
        render_categories(f, right[1], dashboard);
        render_chart(f, right[2], surface.renderer.chart());
        render_alerts(f, right[3], dashboard);
    } else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Drop bills on the left to see your spending",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Results "));
        f.render_widget(empty, columns[1]);
    }

    render_status_bar(f, chunks[2], app);

    if dashboard.loading {
        render_loading(f, f.size());
    }
}

fn render_header(f: &mut Frame, area: Rect, dashboard: &DashboardModel, state: PipelineState) {
    let state_color = match state {
        PipelineState::Idle => Color::Green,
        PipelineState::Failed => Color::Red,
        _ => Color::Yellow,
    };

    let mut spans = vec![
        Span::styled(
            "🧾 Bill Tally",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(state.label().to_string(), Style::default().fg(state_color)),
    ];

    if dashboard.results_visible && !dashboard.total.is_empty() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("Total: {}", dashboard.total),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_drop_zone(f: &mut Frame, area: Rect) {
    let content = vec![
        Line::from(Span::styled(
            "  Drag & drop bill images here",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  (dropped files are pasted as paths)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let zone = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(" Drop Zone "),
    );

    f.render_widget(zone, area);
}

fn render_file_input(f: &mut Frame, area: Rect, app: &App) {
    let input = Paragraph::new(Line::from(vec![
        Span::styled("→ ", Style::default().fg(Color::Yellow)),
        Span::raw(app.input.as_str()),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Select files (Enter to upload) "),
    );

    f.render_widget(input, area);
}

fn render_file_list(f: &mut Frame, area: Rect, dashboard: &DashboardModel) {
    let items: Vec<ListItem> = dashboard
        .files
        .iter()
        .map(|row| ListItem::new(format!("{} {}", row.icon, truncate(&row.name, 40))))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Uploaded Files ({}) ", dashboard.files.len())),
    );

    f.render_widget(list, area);
}

fn render_total(f: &mut Frame, area: Rect, dashboard: &DashboardModel) {
    let total = Paragraph::new(Line::from(Span::styled(
        format!("  {}", dashboard.total),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).title(" Total Spending "));

    f.render_widget(total, area);
}

fn render_categories(f: &mut Frame, area: Rect, dashboard: &DashboardModel) {
    let header = Row::new(["Category", "Amount"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = dashboard.categories.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.label.clone()),
            Cell::from(row.amount.clone()).style(Style::default().fg(Color::Green)),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(20), Constraint::Length(14)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Category Breakdown "),
        );

    f.render_widget(table, area);
}

fn render_chart(f: &mut Frame, area: Rect, chart: Option<&ChartData>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Spending Chart ");

    let Some(chart) = chart.filter(|c| !c.is_empty()) else {
        f.render_widget(Paragraph::new("  No spending to chart").block(block), area);
        return;
    };

    let bars: Vec<Bar> = chart
        .segments
        .iter()
        .map(|segment| {
            let color = hex_color(segment.color);
            Bar::default()
                .value((segment.value * 100.0).round() as u64)
                .text_value(format!("{:.0}%", segment.share * 100.0))
                .label(Line::from(truncate(&segment.label, 10)))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let barchart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(2);

    f.render_widget(barchart, area);
}

fn render_alerts(f: &mut Frame, area: Rect, dashboard: &DashboardModel) {
    let items: Vec<ListItem> = dashboard
        .alerts
        .iter()
        .map(|alert| match alert {
            AlertRow::Warning(text) => {
                ListItem::new(format!("⚠️  {}", text)).style(Style::default().fg(Color::Red))
            }
            AlertRow::Notice(text) => ListItem::new(format!("✓ {}", text)).style(Style::default().fg(Color::Green)),
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Alerts "),
    );

    f.render_widget(list, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let status_spans = vec![
        Span::styled(
            format!(" Uploads: {} ", app.submissions),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Drop/Paste", Style::default().fg(Color::Yellow)),
        Span::raw(" Upload | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Upload typed paths | "),
        Span::styled("Ctrl-U", Style::default().fg(Color::Yellow)),
        Span::raw(" Clear input | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_loading(f: &mut Frame, area: Rect) {
    let popup = centered_rect(40, 5, area);
    let overlay = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  ⏳ Processing bills...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(Clear, popup);
    f.render_widget(overlay, popup);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::White;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(255);
    Color::Rgb(channel(0), channel(2), channel(4))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#4299e1"), Color::Rgb(0x42, 0x99, 0xe1));
        assert_eq!(hex_color("nope"), Color::White);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("receipt.png", 20), "receipt.png");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_centered_rect_fits_small_area() {
        let area = Rect { x: 0, y: 0, width: 20, height: 3 };
        let popup = centered_rect(40, 5, area);
        assert_eq!(popup, Rect { x: 0, y: 0, width: 20, height: 3 });
    }
}
