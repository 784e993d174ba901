use anyhow::Result;
use crime_forecast::insights::{INSIGHTS, INSIGHTS_HEADING};
use crime_forecast::{Dashboard, Dataset, Forecast, ForecastConfig, ForecastOutcome, ForecastPoint, Selection};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset as ChartDataset, GraphType, List, ListItem,
        ListState, Paragraph, Row, Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Forecast,
    Insights,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Forecast,
            Page::Forecast => Page::Insights,
            Page::Insights => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Insights,
            Page::Forecast => Page::Dashboard,
            Page::Insights => Page::Forecast,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Filtered Data",
            Page::Forecast => "Forecast",
            Page::Insights => "Insights",
        }
    }
}

/// Which widget the arrow keys drive on the dashboard page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Locations,
    CrimeTypes,
    Table,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Locations => Focus::CrimeTypes,
            Focus::CrimeTypes => Focus::Table,
            Focus::Table => Focus::Locations,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::Locations => Focus::Table,
            Focus::CrimeTypes => Focus::Locations,
            Focus::Table => Focus::CrimeTypes,
        }
    }
}

pub struct App {
    pub dataset: Dataset,
    pub forecast_config: ForecastConfig,
    pub dashboard: Dashboard,
    pub current_page: Page,
    pub focus: Focus,
    pub location_state: ListState,
    pub crime_type_state: ListState,
    pub table_state: TableState,
}

impl App {
    pub fn new(dataset: Dataset, forecast_config: ForecastConfig) -> Self {
        let selection = Selection::all(&dataset);
        let dashboard = Dashboard::build(&dataset, selection, &forecast_config);

        let mut location_state = ListState::default();
        location_state.select(Some(0));
        let mut crime_type_state = ListState::default();
        crime_type_state.select(Some(0));

        let mut table_state = TableState::default();
        if !dashboard.rows.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            dataset,
            forecast_config,
            dashboard,
            current_page: Page::Dashboard,
            focus: Focus::Locations,
            location_state,
            crime_type_state,
            table_state,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.dashboard.selection
    }

    /// Recompute every stage for a new selection
    pub fn apply_selection(&mut self, selection: Selection) {
        self.dashboard = Dashboard::build(&self.dataset, selection, &self.forecast_config);

        // Reset selection to first row
        if !self.dashboard.rows.is_empty() {
            self.table_state.select(Some(0));
        } else {
            self.table_state.select(None);
        }
    }

    /// Toggle the highlighted entry of the focused filter list
    pub fn toggle_current(&mut self) {
        let mut selection = self.selection().clone();
        match self.focus {
            Focus::Locations => {
                let Some(value) = self.highlighted(&self.location_state, &self.dashboard.options.locations) else {
                    return;
                };
                selection.toggle_location(&value);
            }
            Focus::CrimeTypes => {
                let Some(value) = self.highlighted(&self.crime_type_state, &self.dashboard.options.crime_types)
                else {
                    return;
                };
                selection.toggle_crime_type(&value);
            }
            Focus::Table => return,
        }
        self.apply_selection(selection);
    }

    pub fn select_all(&mut self) {
        self.apply_selection(Selection::all(&self.dataset));
    }

    pub fn select_none(&mut self) {
        self.apply_selection(Selection::none());
    }

    fn highlighted(&self, state: &ListState, options: &[String]) -> Option<String> {
        state.selected().and_then(|i| options.get(i)).cloned()
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        match self.focus {
            Focus::Locations => {
                let len = self.dashboard.options.locations.len();
                step_list(&mut self.location_state, len, true);
            }
            Focus::CrimeTypes => {
                let len = self.dashboard.options.crime_types.len();
                step_list(&mut self.crime_type_state, len, true);
            }
            Focus::Table => {
                let len = self.dashboard.rows.len();
                step_table(&mut self.table_state, len, 1);
            }
        }
    }

    pub fn previous(&mut self) {
        match self.focus {
            Focus::Locations => {
                let len = self.dashboard.options.locations.len();
                step_list(&mut self.location_state, len, false);
            }
            Focus::CrimeTypes => {
                let len = self.dashboard.options.crime_types.len();
                step_list(&mut self.crime_type_state, len, false);
            }
            Focus::Table => {
                let len = self.dashboard.rows.len();
                step_table(&mut self.table_state, len, -1);
            }
        }
    }

    pub fn page_down(&mut self) {
        let len = self.dashboard.rows.len();
        step_table(&mut self.table_state, len, 20);
    }

    pub fn page_up(&mut self) {
        let len = self.dashboard.rows.len();
        step_table(&mut self.table_state, len, -20);
    }
}

fn step_list(state: &mut ListState, len: usize, forward: bool) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    state.select(Some(i));
}

/// Move the table cursor by `delta` rows, wrapping on single steps and
/// clamping on page jumps.
fn step_table(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let last = len as isize - 1;
    let i = match delta {
        1 if current >= last => 0,
        -1 if current <= 0 => last,
        _ => (current + delta).clamp(0, last),
    };
    state.select(Some(i as usize));
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Right | KeyCode::Char('l') => app.focus = app.focus.next(),
                KeyCode::Left | KeyCode::Char('h') => app.focus = app.focus.previous(),
                KeyCode::Char(' ') | KeyCode::Enter => app.toggle_current(),
                KeyCode::Char('a') => app.select_all(),
                KeyCode::Char('n') => app.select_none(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Dashboard => render_dashboard(f, chunks[1], app),
        Page::Forecast => render_forecast(f, chunks[1], app),
        Page::Insights => render_insights(f, chunks[1]),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Dashboard, Page::Forecast, Page::Insights];

    let mut tab_spans = vec![Span::styled(
        format!("{}  ", app.dashboard.title),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", app.dashboard.rows.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Incidents: {}", app.dashboard.total_count()),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(area);

    let filters = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);

    let locations = filter_list(
        " Location(s) ",
        &app.dashboard.options.locations,
        |l| app.dashboard.selection.has_location(l),
        app.focus == Focus::Locations,
    );
    f.render_stateful_widget(locations, filters[0], &mut app.location_state);

    let crime_types = filter_list(
        " Crime Type(s) ",
        &app.dashboard.options.crime_types,
        |t| app.dashboard.selection.has_crime_type(t),
        app.focus == Focus::CrimeTypes,
    );
    f.render_stateful_widget(crime_types, filters[1], &mut app.crime_type_state);

    render_table(f, content[0], app);
    render_bar_chart(f, content[1], app);
}

fn filter_list<'a>(
    title: &'a str,
    options: &'a [String],
    is_selected: impl Fn(&str) -> bool,
    focused: bool,
) -> List<'a> {
    let items: Vec<ListItem> = options
        .iter()
        .map(|o| {
            let (mark, color) = if is_selected(o) {
                ("[x] ", Color::Green)
            } else {
                ("[ ] ", Color::DarkGray)
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(color)),
                Span::raw(truncate(o, 18)),
            ]))
        })
        .collect();

    List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(focused))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ")
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["date", "location", "crime_type", "crime_count"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.dashboard.rows.iter().map(|r| {
        let cells = vec![
            Cell::from(r.date.to_string()),
            Cell::from(truncate(&r.location, 18)),
            Cell::from(truncate(&r.crime_type, 18)),
            Cell::from(format!("{:>8}", r.crime_count)).style(Style::default().fg(Color::Cyan)),
        ];
        Row::new(cells).height(1)
    });

    let title = if app.dashboard.rows.is_empty() {
        " Filtered Crime Data - no rows match the current selection "
    } else {
        " Filtered Crime Data "
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(app.focus == Focus::Table))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_bar_chart(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Crime Type Distribution ");

    if app.dashboard.type_totals.is_empty() {
        let empty = Paragraph::new("No data for the current selection")
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let data: Vec<(&str, u64)> = app.dashboard.type_totals.iter().collect();

    let chart = BarChart::default()
        .block(block)
        .data(data.as_slice())
        .bar_width(12)
        .bar_gap(3)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD))
        .label_style(Style::default().fg(Color::Yellow));

    f.render_widget(chart, area);
}

fn render_forecast(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Forecasting Future Crime Trends ");

    let forecast = match &app.dashboard.forecast {
        ForecastOutcome::Available(forecast) => forecast,
        ForecastOutcome::Unavailable { reason } => {
            let notice = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  Forecast unavailable",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(format!("  {}", reason), Style::default().fg(Color::DarkGray))),
            ])
            .block(block);
            f.render_widget(notice, area);
            return;
        }
    };

    let actual = chart_points(forecast, |p| p.actual);
    let yhat = chart_points(forecast, |p| Some(p.yhat));
    let lower = chart_points(forecast, |p| Some(p.yhat_lower));
    let upper = chart_points(forecast, |p| Some(p.yhat_upper));

    let (lo, hi) = forecast.value_range();
    let pad = ((hi - lo) * 0.08).max(1.0);
    let (y_min, y_max) = (lo - pad, hi + pad);
    let x_max = forecast.len().saturating_sub(1) as f64;

    let datasets = vec![
        ChartDataset::default()
            .name("lower")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&lower),
        ChartDataset::default()
            .name("upper")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&upper),
        ChartDataset::default()
            .name("yhat")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&yhat),
        ChartDataset::default()
            .name("actual")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::White))
            .data(&actual),
    ];

    let date_label = |i: usize| {
        forecast
            .points
            .get(i)
            .map(|p| p.date.format("%Y-%m").to_string())
            .unwrap_or_default()
    };
    let last = forecast.len().saturating_sub(1);
    let x_labels = vec![
        Span::raw(date_label(0)),
        Span::raw(date_label(last / 2)),
        Span::raw(date_label(last)),
    ];
    let y_labels = vec![
        Span::raw(format!("{:.0}", y_min)),
        Span::raw(format!("{:.0}", (y_min + y_max) / 2.0)),
        Span::raw(format!("{:.0}", y_max)),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("ds")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("y")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(y_labels),
        );

    f.render_widget(chart, area);
}

/// Points keyed by month index, since the chart axis is numeric
fn chart_points(forecast: &Forecast, value: impl Fn(&ForecastPoint) -> Option<f64>) -> Vec<(f64, f64)> {
    forecast
        .points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| value(p).map(|v| (i as f64, v)))
        .collect()
}

fn render_insights(f: &mut Frame, area: Rect) {
    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", INSIGHTS_HEADING),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ];

    for section in INSIGHTS {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            format!("  {}", section.title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )));
        for paragraph in section.paragraphs {
            content.push(Line::from(format!("  {}", paragraph)));
        }
        for bullet in section.bullets {
            content.push(Line::from(vec![
                Span::styled("    • ", Style::default().fg(Color::Green)),
                Span::raw(*bullet),
            ]));
        }
    }

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Insights & Interpretation "),
        );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selection = app.selection();

    let mut status_spans = vec![Span::styled(
        format!(
            " Locations: {}/{}  Types: {}/{} ",
            selection.locations.len(),
            app.dashboard.options.locations.len(),
            selection.crime_types.len(),
            app.dashboard.options.crime_types.len(),
        ),
        Style::default().fg(Color::Cyan),
    )];

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Space", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Toggle | "));
    status_spans.push(Span::styled("a/n", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" All/None | "));
    status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Focus | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Dataset::sample(), ForecastConfig::default())
    }

    #[test]
    fn test_starts_with_everything_selected() {
        let app = app();
        assert_eq!(app.dashboard.rows.len(), 36);
        assert_eq!(app.table_state.selected(), Some(0));
        assert_eq!(app.current_page, Page::Dashboard);
    }

    #[test]
    fn test_toggle_location_recomputes_dashboard() {
        let mut app = app();
        // first location is Durban
        app.toggle_current();

        assert!(!app.selection().has_location("Durban"));
        assert_eq!(app.dashboard.rows.len(), 24);
        assert_eq!(app.dashboard.type_totals.get("Theft"), None);

        app.toggle_current();
        assert_eq!(app.dashboard.rows.len(), 36);
    }

    #[test]
    fn test_toggle_crime_type() {
        let mut app = app();
        app.focus = Focus::CrimeTypes;
        app.next(); // Assault
        app.toggle_current();

        assert!(!app.selection().has_crime_type("Assault"));
        assert_eq!(app.dashboard.type_totals.len(), 2);
    }

    #[test]
    fn test_select_none_and_all() {
        let mut app = app();
        app.select_none();
        assert!(app.dashboard.rows.is_empty());
        assert_eq!(app.table_state.selected(), None);
        assert!(!app.dashboard.forecast.is_available());

        app.select_all();
        assert_eq!(app.dashboard.rows.len(), 36);
        assert!(app.dashboard.forecast.is_available());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.location_state.selected(), Some(2));

        app.focus = Focus::Table;
        app.previous();
        assert_eq!(app.table_state.selected(), Some(35));
        app.next();
        assert_eq!(app.table_state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.table_state.selected(), Some(20));
        app.page_down();
        assert_eq!(app.table_state.selected(), Some(35));
    }

    #[test]
    fn test_page_cycle() {
        let mut app = app();
        app.next_page();
        assert_eq!(app.current_page, Page::Forecast);
        app.next_page();
        app.next_page();
        assert_eq!(app.current_page, Page::Dashboard);
        app.previous_page();
        assert_eq!(app.current_page, Page::Insights);
    }

    #[test]
    fn test_focus_cycle_and_table_toggle_is_noop() {
        let mut app = app();
        app.focus = app.focus.previous();
        assert_eq!(app.focus, Focus::Table);
        app.toggle_current();
        assert_eq!(app.dashboard.rows.len(), 36);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Durban", 18), "Durban");
        assert_eq!(truncate("Johannesburg North", 10), "Johanne...");
    }
}
