use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use crossterm::event::{KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::models::{Fetch, NextPrayer, PrayerDay};
use crate::prayer_times::{next_prayer_at, today_index, CalendarLoader};
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::next_prayer::Placeholder;
use crate::tui::widgets::{calendar, header, next_prayer, prayers, statusbar};

/// Minimum gap between automatic calendar reloads.
const RELOAD_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Today,
    Calendar,
    Help,
}

pub struct App {
    pub view: View,
    pub config: AppConfig,
    pub should_quit: bool,
    pub calendar: Fetch<Vec<PrayerDay>>,
    pub next: Option<NextPrayer>,
    pub now: NaiveDateTime,
    last_reload: Option<NaiveDateTime>,
}

impl App {
    pub fn new(config: AppConfig, now: NaiveDateTime) -> Self {
        App {
            view: View::Today,
            config,
            should_quit: false,
            calendar: Fetch::Loading,
            next: None,
            now,
            last_reload: None,
        }
    }

    pub fn reload(&mut self, conn: &Connection) {
        self.calendar = Fetch::Loading;
        self.last_reload = Some(self.now);
        let loaded = CalendarLoader::new(conn, &self.config)
            .load_window(self.now.date())
            .map_err(|e| format!("{:#}", e));
        if let Err(e) = &loaded {
            log::warn!("Calendar load failed: {}", e);
        }
        self.calendar = Fetch::from_result(loaded);
        self.recompute(self.now);
    }

    /// Derive the next prayer for `now`. Pure apart from updating state.
    pub fn recompute(&mut self, now: NaiveDateTime) {
        self.now = now;
        self.next = self
            .calendar
            .ready()
            .and_then(|window| next_prayer_at(now, window));
    }

    /// A loaded window that no longer yields a next prayer is refetched from
    /// today, at most once per interval.
    pub fn needs_reload(&self) -> bool {
        if self.calendar.ready().is_none() || self.next.is_some() {
            return false;
        }
        match self.last_reload {
            None => true,
            Some(at) => self.now - at >= Duration::seconds(RELOAD_INTERVAL_SECS),
        }
    }

    pub fn tick(&mut self, conn: &Connection) {
        self.recompute(self.config.local_now());
        if self.needs_reload() {
            log::info!("Calendar window exhausted at {}; reloading", self.now);
            self.reload(conn);
        }
    }

    fn today(&self) -> Option<&PrayerDay> {
        let window = self.calendar.ready()?;
        window.get(today_index(window, self.now.date())?)
    }

    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent, conn: &Connection) {
        // Some terminals also report release and repeat events
        if key.kind != KeyEventKind::Press {
            return;
        }
        match (&self.view, key.code) {
            (View::Help, KeyCode::Esc | KeyCode::Char('?')) => self.view = View::Today,
            (View::Calendar, KeyCode::Esc | KeyCode::Char('c')) => self.view = View::Today,
            (View::Today, KeyCode::Esc | KeyCode::Char('q')) => self.should_quit = true,
            (_, KeyCode::Char('?')) => self.view = View::Help,
            (_, KeyCode::Char('c')) => self.view = View::Calendar,
            (_, KeyCode::Char('r')) => self.reload(conn),
            _ => {}
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(theme::base()), area);

        let outer_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // header
                Constraint::Min(0),    // body
                Constraint::Length(1), // status bar
            ])
            .split(area);

        let today = self.today();
        header::render(
            frame,
            outer_chunks[0],
            &self.config.organization,
            &self.config.location.name,
            today.map(|d| &d.hijri),
            self.now,
        );
        statusbar::render(frame, outer_chunks[2], statusbar::DASHBOARD_HINTS);

        match self.view {
            View::Calendar => self.draw_calendar(frame, outer_chunks[1]),
            View::Today => self.draw_today(frame, outer_chunks[1]),
            View::Help => {
                self.draw_today(frame, outer_chunks[1]);
                self.draw_help_overlay(frame);
            }
        }
    }

    fn draw_today(&self, frame: &mut Frame, body: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(body);

        prayers::render(frame, columns[0], self.today(), self.now, self.next.as_ref());

        let countdown = match (&self.calendar, &self.next) {
            (_, Some(next)) => Ok(next),
            (Fetch::Loading, None) => Err(Placeholder::Loading),
            (Fetch::Failed(msg), None) => Err(Placeholder::Failed(msg.as_str())),
            (Fetch::Ready(_), None) => Err(Placeholder::NoData),
        };
        next_prayer::render(frame, columns[1], countdown);
    }

    fn draw_calendar(&self, frame: &mut Frame, body: Rect) {
        match &self.calendar {
            Fetch::Ready(window) => calendar::render(frame, body, window, self.now.date()),
            Fetch::Loading => frame.render_widget(
                Paragraph::new(Span::styled("  Loading calendar…", theme::dim())),
                body,
            ),
            Fetch::Failed(msg) => frame.render_widget(
                Paragraph::new(Span::styled(format!("  {}", msg), theme::red())),
                body,
            ),
        }
    }

    fn draw_help_overlay(&self, frame: &mut Frame) {
        let area = frame.area();

        // Center a help box
        let popup_area = Rect {
            x: area.width / 4,
            y: area.height / 4,
            width: area.width / 2,
            height: area.height / 2,
        };

        frame.render_widget(Clear, popup_area);

        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {:<8}", k), theme::accent()),
                Span::styled(what, theme::dim()),
            ])
        };
        let help_text = vec![
            Line::from(Span::styled(
                "  Keybindings",
                theme::gold().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            key("[c]", "Toggle calendar window"),
            key("[r]", "Reload calendar"),
            key("[?]", "Toggle help"),
            key("[Esc]", "Back / quit"),
            Line::from(""),
            Line::from(Span::styled(
                format!("  Method {} · {} days", self.config.calendar.method, self.config.calendar.window()),
                theme::dim(),
            )),
        ];

        let block = Block::default()
            .title(Span::styled(" Help ", theme::gold()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::gold())
            .style(theme::surface());

        frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
    }
}

/// Run the dashboard event loop.
pub fn run(conn: Connection, config: AppConfig) -> Result<()> {
    let now = config.local_now();
    let mut app = App::new(config, now);
    app.reload(&conn);

    let mut terminal = ratatui::init();
    let events = EventHandler::new(std::time::Duration::from_secs(1));

    let result = (|| -> Result<()> {
        loop {
            terminal.draw(|frame| app.draw(frame))?;

            match events.next()? {
                Event::Key(key) => {
                    app.handle_key(key, &conn);
                    if app.should_quit {
                        break;
                    }
                }
                Event::Tick => app.tick(&conn),
                Event::Resize => {}
            }
        }
        Ok(())
    })();

    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerName;
    use crate::prayer_times::next::fixtures;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn app_with(days: i64, now: NaiveDateTime) -> App {
        let mut app = App::new(AppConfig::default(), now);
        app.calendar = Fetch::Ready(fixtures::window(date(), days));
        app.recompute(now);
        app
    }

    #[test]
    fn recompute_tracks_the_clock() {
        let mut app = app_with(2, date().and_time(fixtures::hm(17, 0)));
        assert_eq!(app.next.as_ref().unwrap().name, PrayerName::Maghrib);

        app.recompute(date().and_time(fixtures::hm(18, 30)));
        assert_eq!(app.next.as_ref().unwrap().name, PrayerName::Isha);
        assert_eq!(app.next.as_ref().unwrap().countdown(), "01:00:00");
        assert!(!app.needs_reload());
    }

    #[test]
    fn exhausted_window_requests_reload_once_per_interval() {
        let now = date().and_time(fixtures::hm(21, 0));
        let mut app = app_with(1, now);
        assert!(app.next.is_none());
        assert!(app.needs_reload());

        app.last_reload = Some(now);
        app.recompute(now + Duration::seconds(30));
        assert!(!app.needs_reload());
        app.recompute(now + Duration::seconds(61));
        assert!(app.needs_reload());
    }

    #[test]
    fn loading_or_failed_calendar_never_reloads_on_tick() {
        let now = date().and_time(fixtures::hm(21, 0));
        let mut app = App::new(AppConfig::default(), now);
        assert!(!app.needs_reload());
        app.calendar = Fetch::Failed("offline".into());
        app.recompute(now);
        assert!(app.next.is_none());
        assert!(!app.needs_reload());
    }

    #[test]
    fn today_follows_the_date() {
        let app = app_with(3, (date() + Duration::days(1)).and_time(fixtures::hm(9, 0)));
        assert_eq!(app.today().unwrap().date, date() + Duration::days(1));
    }
}
