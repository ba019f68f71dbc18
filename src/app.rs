use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io::{self, Write};

use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame, Terminal,
};

use crate::config::{Settings, ZoneSetting};
use crate::error::DashboardError;
use crate::forecast::{
    group_by_day, rainfall_outlook, upcoming_days, DailySummary, DayBoundary, RainfallOutlook,
};
use crate::owm::{Dataset, Sources};
use crate::units::{direction, format_degrees, format_temperature, round_half_up, TemperatureUnit};
use crate::weather::{icon_glyph, CurrentConditions};

const MISSING: &str = "--";

/// Rainfall tiles shown under the totals.
const RAIN_TILES: usize = 4;

/// Loaded payloads plus everything derived from them for display.
pub struct Dashboard {
    sources: Sources,
    zone: ZoneSetting,
    unit: TemperatureUnit,
    hourly_slots: usize,
    forecast_days: usize,
    dataset: Dataset,
    boundary: DayBoundary,
    daily: Vec<DailySummary>,
    rainfall: RainfallOutlook,
    status: Option<String>,
}

impl Dashboard {
    pub fn new(settings: &Settings, dataset: Dataset) -> Self {
        let mut dashboard = Self {
            sources: settings.sources.clone(),
            zone: settings.zone,
            unit: settings.unit,
            hourly_slots: settings.hourly_slots,
            forecast_days: settings.forecast_days,
            dataset: Dataset::default(),
            boundary: DayBoundary::Local,
            daily: Vec::new(),
            rainfall: RainfallOutlook::default(),
            status: None,
        };
        dashboard.set_dataset(dataset);
        dashboard
    }

    pub fn load(settings: &Settings) -> Result<Self, DashboardError> {
        let dataset = Dataset::load(&settings.sources)?;
        Ok(Self::new(settings, dataset))
    }

    fn set_dataset(&mut self, dataset: Dataset) {
        self.boundary = self.zone.boundary(dataset.utc_offset);
        self.daily = group_by_day(&dataset.samples, &self.boundary);
        self.rainfall = rainfall_outlook(&dataset.samples, self.hourly_slots, &self.boundary);
        self.dataset = dataset;
    }

    /// Re-reads the payload files. On failure the previous data stays on screen.
    pub fn reload(&mut self) {
        match Dataset::load(&self.sources) {
            Ok(dataset) => {
                self.set_dataset(dataset);
                self.status = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "reload failed");
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn toggle_unit(&mut self) {
        self.unit = self.unit.toggle();
        tracing::debug!(unit = %self.unit, "display unit toggled");
    }

    /// Applies a key press. Returns `false` when the dashboard should close.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('u') => self.toggle_unit(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        true
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn upcoming(&self) -> &[DailySummary] {
        upcoming_days(&self.daily, self.forecast_days)
    }

    fn headline_title(&self) -> String {
        if let Some(ref place) = self.dataset.place {
            place.title()
        } else if let Some(name) = self
            .dataset
            .current
            .as_ref()
            .and_then(|c| c.station_name.clone())
        {
            name
        } else {
            MISSING.to_string()
        }
    }

    fn clock(&self, timestamp: i64, fmt: &str) -> String {
        self.boundary
            .local_datetime(timestamp)
            .map(|dt| dt.format(fmt).to_string())
            .unwrap_or_else(|| MISSING.to_string())
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, dashboard: &mut Dashboard) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, dashboard))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && !dashboard.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn value(text: String) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::Green))
}

fn display_headline(dashboard: &Dashboard) -> Paragraph<'static> {
    let country = dashboard
        .dataset
        .place
        .as_ref()
        .map(|p| p.country.clone())
        .unwrap_or_default();
    let observed = match dashboard.dataset.current {
        Some(ref current) => dashboard.clock(current.observed_at, "%d-%m-%Y %H:%M"),
        None => MISSING.to_string(),
    };

    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                dashboard.headline_title(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(country, Style::default().fg(Color::Blue)),
        ]),
        Line::from(format!(" {observed} ({})", dashboard.boundary)),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn display_current_conditions(
    current: Option<&CurrentConditions>,
    unit: TemperatureUnit,
) -> Table<'static> {
    let row = |label: &str, text: String| {
        Row::new(vec![
            Cell::from(format!(" {label}")),
            Cell::from(text).style(Style::default().fg(Color::Green)),
        ])
    };

    let mut rows = vec![Row::new(vec![Cell::from("")])];
    match current {
        Some(current) => {
            rows.push(row("Temperature", format_temperature(current.temperature, unit)));
            rows.push(row("Feels like", format_temperature(current.feels_like, unit)));
            rows.push(row(
                "Low / High",
                format!(
                    "{} / {}",
                    format_temperature(current.temperature_min, unit),
                    format_temperature(current.temperature_max, unit)
                ),
            ));
            rows.push(row("Humidity", format!("{}%", current.humidity)));
            let wind = match current.wind_direction {
                Some(deg) => format!(
                    "{:.1} m/s ({})",
                    current.wind_speed,
                    direction::degree_to_compass(deg)
                ),
                None => format!("{:.1} m/s", current.wind_speed),
            };
            rows.push(row("Wind", wind));
            let text = if current.description.is_empty() {
                MISSING.to_string()
            } else {
                format!("{} {}", icon_glyph(&current.icon), current.description)
            };
            rows.push(row("Conditions", text));
        }
        None => rows.push(row("Temperature", MISSING.to_string())),
    }

    Table::new(rows, [Constraint::Length(13), Constraint::Min(15)])
        .block(panel("Current Conditions"))
}

fn display_rainfall(outlook: &RainfallOutlook) -> Paragraph<'static> {
    let muted = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                format!("{:.1} mm", outlook.total_rainfall),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!(" Expected rainfall ({}h)", outlook.hours()),
            muted,
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                format!("{}%", round_half_up(outlook.average_probability)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(" Chance of precipitation", muted)),
        Line::from(""),
    ];

    let tiles = &outlook.slots[..RAIN_TILES.min(outlook.slots.len())];
    if tiles.is_empty() {
        lines.push(Line::from(format!(" {MISSING}")));
    } else {
        let column = |f: &dyn Fn(usize) -> String| {
            let cells: String = (0..tiles.len()).map(|i| format!("{:>8}", f(i))).collect();
            Line::from(cells)
        };
        lines.push(column(&|i| tiles[i].time_label.clone()).style(muted));
        lines.push(column(&|i| format!("{}%", round_half_up(tiles[i].probability))));
        lines.push(column(&|i| format!("{:.1}mm", tiles[i].amount)).style(muted));
    }

    Paragraph::new(lines).block(panel("Rainfall Forecast"))
}

fn display_day(day: &DailySummary, unit: TemperatureUnit) -> Text<'static> {
    let description = if day.weather_description.is_empty() {
        MISSING.to_string()
    } else {
        day.weather_description.clone()
    };
    Text::from(vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                day.date.date().format("%a, %b %-d").to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {} ", icon_glyph(&day.weather_icon_id))),
            Span::raw(description),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:10}", "Low/High")),
            Span::styled(
                format_degrees(day.temperature_min, unit),
                Style::default().fg(Color::Blue),
            ),
            Span::raw(" / "),
            Span::styled(
                format_degrees(day.temperature_max, unit),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:10}", "Humidity")),
            value(format!("{}%", day.humidity)),
            Span::raw("   Wind "),
            value(format!("{}m/s", day.wind_speed)),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:10}", "Rain")),
            value(format!(
                "{:.1}mm ({}%)",
                day.rainfall_total,
                round_half_up(day.rain_probability_avg)
            )),
        ]),
    ])
}

fn ui(f: &mut Frame, dashboard: &Dashboard) {
    let [head, body, foot] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .margin(1)
    .areas(f.area());

    f.render_widget(display_headline(dashboard), head);

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    let [upper, lower] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(left);

    f.render_widget(
        display_current_conditions(dashboard.dataset.current.as_ref(), dashboard.unit()),
        upper,
    );
    f.render_widget(display_rainfall(&dashboard.rainfall), lower);

    let days = dashboard.upcoming();
    let title = format!("{}-Day Forecast", days.len());
    let mut list_items = vec![];
    if days.is_empty() {
        list_items.push(ListItem::new(format!("\n  {MISSING}")));
    } else {
        for day in days {
            list_items.push(ListItem::new(display_day(day, dashboard.unit())));
        }
    }
    f.render_widget(List::new(list_items).block(panel(&title)), right);

    let mut footer = vec![Span::styled(
        " q quit  u switch unit  r reload",
        Style::default().fg(Color::DarkGray),
    )];
    if let Some(ref status) = dashboard.status {
        footer.push(Span::raw("  "));
        footer.push(Span::styled(status.clone(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(footer)), foot);
}

/// Writes the dashboard's aggregates as plain text, for `--summary`.
pub fn print_summary<W: Write>(dashboard: &Dashboard, out: &mut W) -> io::Result<()> {
    let unit = dashboard.unit();
    writeln!(out, "{}", dashboard.headline_title())?;

    if let Some(ref current) = dashboard.dataset.current {
        writeln!(
            out,
            "Now: {}, feels like {}, {}",
            format_temperature(current.temperature, unit),
            format_temperature(current.feels_like, unit),
            if current.description.is_empty() {
                MISSING
            } else {
                current.description.as_str()
            }
        )?;
    }

    let rain = &dashboard.rainfall;
    writeln!(
        out,
        "Rainfall ({}h): {:.1} mm, {}% chance",
        rain.hours(),
        rain.total_rainfall,
        round_half_up(rain.average_probability)
    )?;
    for slot in &rain.slots {
        writeln!(
            out,
            "  {}  {:>3}%  {:.1}mm",
            slot.time_label,
            round_half_up(slot.probability),
            slot.amount
        )?;
    }

    writeln!(out, "Forecast:")?;
    let days = dashboard.upcoming();
    if days.is_empty() {
        writeln!(out, "  {MISSING}")?;
    }
    for day in days {
        writeln!(
            out,
            "  {}  {} / {}  {}  humidity {}%  wind {}m/s  rain {:.1}mm ({}%)",
            day.date.date().format("%a, %b %-d"),
            format_degrees(day.temperature_min, unit),
            format_degrees(day.temperature_max, unit),
            if day.weather_description.is_empty() {
                MISSING
            } else {
                day.weather_description.as_str()
            },
            day.humidity,
            day.wind_speed,
            day.rainfall_total,
            round_half_up(day.rain_probability_avg)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::owm::{current, forecast, geocoding, CURRENT_JSON, FORECAST_JSON, LOCATION_JSON};
    use clap::Parser;
    use ratatui::backend::TestBackend;

    fn settings(extra: &[&str]) -> Settings {
        let mut argv = vec!["wxdash", "/nonexistent/forecast.json", "--timezone", "UTC"];
        argv.extend_from_slice(extra);
        Settings::resolve(&Args::parse_from(argv), Default::default()).unwrap()
    }

    fn dataset() -> Dataset {
        let fc: forecast::ForecastResponse = serde_json::from_str(FORECAST_JSON).unwrap();
        let now: current::CurrentWeatherResponse = serde_json::from_str(CURRENT_JSON).unwrap();
        let geo: geocoding::GeocodingFile = serde_json::from_str(LOCATION_JSON).unwrap();
        Dataset {
            samples: fc.list.iter().map(|i| i.to_sample()).collect(),
            current: Some(now.to_conditions()),
            place: geo.first().map(|g| g.to_place()),
            utc_offset: fc.city.and_then(|c| c.timezone),
        }
    }

    fn rendered(dashboard: &Dashboard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 40)).unwrap();
        terminal.draw(|f| ui(f, dashboard)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_dashboard_aggregates() {
        let dashboard = Dashboard::new(&settings(&[]), dataset());

        assert_eq!(dashboard.daily.len(), 2);
        assert_eq!(dashboard.upcoming().len(), 1);
        assert_eq!(dashboard.rainfall.slots.len(), 3);
        assert_eq!(dashboard.rainfall.total_rainfall, 0.75);
    }

    #[test]
    fn test_render_and_toggle_unit() {
        let mut dashboard = Dashboard::new(&settings(&[]), dataset());

        let screen = rendered(&dashboard);
        assert!(screen.contains("Madison, Wisconsin"));
        assert!(screen.contains("4°C"));
        assert!(screen.contains("Tue, Jan 2"));
        assert!(screen.contains("Rainfall Forecast"));
        assert!(screen.contains("27%"));

        assert!(dashboard.handle_key(KeyCode::Char('u')));
        assert_eq!(dashboard.unit(), TemperatureUnit::Fahrenheit);

        let screen = rendered(&dashboard);
        assert!(screen.contains("40°F"));
        assert!(!screen.contains("°C"));
    }

    #[test]
    fn test_render_without_data() {
        let dashboard = Dashboard::new(&settings(&[]), Dataset::default());

        let screen = rendered(&dashboard);
        assert!(screen.contains("0-Day Forecast"));
        assert!(screen.contains(MISSING));
    }

    #[test]
    fn test_quit_keys() {
        let mut dashboard = Dashboard::new(&settings(&[]), Dataset::default());
        assert!(!dashboard.handle_key(KeyCode::Char('q')));
        assert!(!dashboard.handle_key(KeyCode::Esc));
        assert!(dashboard.handle_key(KeyCode::Char('x')));
    }

    #[test]
    fn test_failed_reload_keeps_data() {
        let mut dashboard = Dashboard::new(&settings(&[]), dataset());

        dashboard.reload();

        assert!(dashboard.status.as_deref().unwrap_or("").contains("failed to read"));
        assert_eq!(dashboard.daily.len(), 2);
        assert!(rendered(&dashboard).contains("failed to read"));
    }

    #[test]
    fn test_reload_picks_up_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.json");
        std::fs::write(&path, FORECAST_JSON).unwrap();
        let settings = Settings::resolve(
            &Args::parse_from(["wxdash", path.to_str().unwrap(), "--timezone", "UTC"]),
            Default::default(),
        )
        .unwrap();

        let mut dashboard = Dashboard::load(&settings).unwrap();
        assert_eq!(dashboard.daily.len(), 2);

        std::fs::write(&path, r#"{"list": []}"#).unwrap();
        assert!(dashboard.handle_key(KeyCode::Char('r')));
        assert!(dashboard.daily.is_empty());
        assert!(dashboard.status.is_none());
    }

    #[test]
    fn test_payload_offset_boundary() {
        let argv = ["wxdash", "forecast.json", "--payload-offset"];
        let settings = Settings::resolve(&Args::parse_from(argv), Default::default()).unwrap();

        let dashboard = Dashboard::new(&settings, dataset());

        // UTC-6 pulls both Jan 1 samples back to Dec 31.
        assert_eq!(dashboard.boundary, DayBoundary::from_offset_seconds(-21600).unwrap());
        assert_eq!(dashboard.daily.len(), 2);
        assert_eq!(dashboard.daily[0].date.to_string(), "2023-12-31");
    }

    #[test]
    fn test_huge_slot_count_labels_available_hours() {
        let max = usize::MAX.to_string();
        let mut dashboard = Dashboard::new(&settings(&["--hourly-slots", &max]), dataset());

        let mut out = Vec::new();
        print_summary(&dashboard, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Rainfall (9h):"));

        assert!(rendered(&dashboard).contains("Expected rainfall (9h)"));
        dashboard.toggle_unit();
        assert!(rendered(&dashboard).contains("Expected rainfall (9h)"));
    }

    #[test]
    fn test_print_summary() {
        let dashboard = Dashboard::new(&settings(&["--unit", "f"]), dataset());
        let mut out = Vec::new();

        print_summary(&dashboard, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Madison, Wisconsin\n"));
        assert!(text.contains("Now: 40°F, feels like 34°F, light rain"));
        assert!(text.contains("Rainfall (9h): 0.8 mm, 27% chance"));
        assert!(text.contains("  00:00   60%"));
        assert!(text.contains("Tue, Jan 2  29° / 36°"));
    }
}
