mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tui_app::{
    format_pm, parse_hex_color, pollutant_rows, short_date, truncate, AppState, CityAnalysis,
    ConnectionStatus, DetailState,
};

const DEFAULT_CITIES: &str = "Delhi,Mumbai,Bangalore,Kolkata,Chennai";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    // Cities from the command line, else TUI_CITIES, else the defaults.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let raw = if args.is_empty() {
        std::env::var("TUI_CITIES").unwrap_or_else(|_| DEFAULT_CITIES.to_string())
    } else {
        args.join(",")
    };
    let cities: Vec<String> = raw
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url, cities);
    let mut city_state = TableState::default();

    // Initial fetch before rendering
    app.refresh(&client).await;
    if let Some(city) = app.city_at(0).map(str::to_string) {
        city_state.select(Some(0));
        app.load_detail(&client, &city).await;
    }

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client, &mut city_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    city_state: &mut TableState,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app, city_state))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let before = city_state.selected();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                app.refresh(client).await;
                if let Some(city) = before.and_then(|i| app.city_at(i)).map(str::to_string) {
                    app.load_detail(client, &city).await;
                }
                continue;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = app.comparison.cities.len().saturating_sub(1);
                city_state.select(Some(before.map_or(0, |i| (i + 1).min(max))));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                city_state.select(Some(before.map_or(0, |i| i.saturating_sub(1))));
            }
            _ => {}
        }

        if city_state.selected() != before {
            if let Some(city) = city_state.selected().and_then(|i| app.city_at(i)).map(str::to_string) {
                app.load_detail(client, &city).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, city_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, city_state, chunks[1]);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 50)), Color::Red),
    };

    let title_spans = vec![
        Span::styled(
            " India AQI Forecast  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} cities", app.comparison.cities.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "history {}d → forecast {}d",
                app.comparison.history_days, app.comparison.forecast_days
            ),
            Style::default().fg(Color::White),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, city_state: &mut TableState, area: Rect) {
    // Horizontal split: cities (35%) | detail (65%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    render_cities_table(f, app, city_state, halves[0]);

    match &app.detail {
        DetailState::Loaded(analysis) => render_detail(f, analysis, halves[1]),
        DetailState::Failed { city, message } => {
            let p = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!(" {city}"),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(format!(" ✗ {message}"), Style::default().fg(Color::Red))),
            ])
            .block(titled_block(" DETAIL "));
            f.render_widget(p, halves[1]);
        }
        DetailState::Empty => {
            let p = Paragraph::new(" Select a city").block(titled_block(" DETAIL "));
            f.render_widget(p, halves[1]);
        }
    }
}

fn render_cities_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["City", "AQI", "Category", "PM2.5", "Fcst"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .comparison
        .cities
        .iter()
        .map(|c| match (&c.summary, &c.error) {
            (Some(s), _) => {
                let color = parse_hex_color(&s.color);
                Row::new(vec![
                    Cell::from(truncate(&c.city, 14)),
                    Cell::from(s.aqi.to_string()).style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Cell::from(s.category.clone()).style(Style::default().fg(color)),
                    Cell::from(format!("{:.1}", s.reading.components.pm2_5)),
                    Cell::from(format_pm(s.forecast_end_pm2_5)).style(Style::default().fg(Color::Cyan)),
                ])
            }
            (None, err) => Row::new(vec![
                Cell::from(truncate(&c.city, 14)),
                Cell::from("—").style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(err.as_deref().unwrap_or("failed"), 24))
                    .style(Style::default().fg(Color::Red)),
                Cell::from(""),
                Cell::from(""),
            ]),
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(titled_block(" CITIES "))
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_detail(f: &mut Frame, a: &CityAnalysis, area: Rect) {
    // Vertical split: pollutants + forecast table | chart
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(8)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    render_pollutants(f, a, top[0]);
    render_forecast_table(f, a, top[1]);
    render_chart(f, a, rows[1]);
}

fn render_pollutants(f: &mut Frame, a: &CityAnalysis, area: Rect) {
    let color = parse_hex_color(&a.color);
    let rows: Vec<Row> = pollutant_rows(&a.reading.components)
        .into_iter()
        .map(|(name, value, unit)| {
            Row::new(vec![
                Cell::from(name).style(Style::default().fg(Color::Yellow)),
                Cell::from(value),
                Cell::from(unit).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", a.city),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("AQI {} {} ", a.reading.aqi, a.category),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ]);

    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Length(8), Constraint::Length(6)],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title),
    );
    f.render_widget(table, area);
}

fn render_forecast_table(f: &mut Frame, a: &CityAnalysis, area: Rect) {
    let header = Row::new(
        ["Date", "PM2.5", "Low", "High"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    );
    let rows: Vec<Row> = a
        .forecast
        .points
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(short_date(&p.date).to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format!("{:.1}", p.pm2_5)).style(Style::default().fg(Color::LightRed)),
                Cell::from(format!("{:.1}", p.lower)),
                Cell::from(format!("{:.1}", p.upper)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(titled_block(&format!(" FORECAST  R² {:.2} ", a.forecast.fit.r_squared)));
    f.render_widget(table, area);
}

fn render_chart(f: &mut Frame, a: &CityAnalysis, area: Rect) {
    let n = a.history.points.len();
    let history: Vec<(f64, f64)> = a
        .history
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.pm2_5))
        .collect();
    let at = |i: usize| (n + i) as f64;
    let forecast: Vec<(f64, f64)> = a.forecast.points.iter().enumerate().map(|(i, p)| (at(i), p.pm2_5)).collect();
    let lower: Vec<(f64, f64)> = a.forecast.points.iter().enumerate().map(|(i, p)| (at(i), p.lower)).collect();
    let upper: Vec<(f64, f64)> = a.forecast.points.iter().enumerate().map(|(i, p)| (at(i), p.upper)).collect();

    let datasets = vec![
        Dataset::default()
            .name("Historical")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&history),
        Dataset::default()
            .name("Forecast")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::LightRed))
            .data(&forecast),
        Dataset::default()
            .name("±15%")
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&lower),
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&upper),
    ];

    let values = history.iter().chain(&upper).chain(&lower).map(|&(_, y)| y);
    let y_max = values.clone().fold(f64::NEG_INFINITY, f64::max).max(10.0) * 1.05;
    let y_min = values.fold(f64::INFINITY, f64::min).min(y_max) * 0.95;
    let x_max = (n + a.forecast.points.len()).max(1) as f64;

    let first = a.history.points.first().map_or("", |p| short_date(&p.date));
    let today = a.forecast.points.first().map_or("", |p| short_date(&p.date));
    let last = a.forecast.points.last().map_or("", |p| short_date(&p.date));

    let chart = Chart::new(datasets)
        .block(titled_block(" PM2.5 HISTORY & FORECAST "))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::raw(first.to_string()),
                    Span::styled(today.to_string(), Style::default().fg(Color::Yellow)),
                    Span::raw(last.to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("µg/m³")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.0}")),
                    Span::raw(format!("{:.0}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{y_max:.0}")),
                ]),
        );
    f.render_widget(chart, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select city  "),
        Span::styled("CO shown in mg/m³", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn titled_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}
