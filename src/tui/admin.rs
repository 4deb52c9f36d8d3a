use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::admin::{BannerKind, ListScreen};
use crate::api::transport::Transport;
use crate::api::ApiClient;
use crate::models::{Fetch, Resource};
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::statusbar;
use crate::utils::format::fit_width;

/// Interactive list of one collection with status toggling and deletion.
pub struct AdminApp<T: Transport> {
    pub screen: ListScreen,
    client: ApiClient<T>,
    /// Record id awaiting a delete confirmation.
    pending_delete: Option<i64>,
    pub should_quit: bool,
}

impl<T: Transport> AdminApp<T> {
    pub fn new(client: ApiClient<T>, resource: Resource) -> Self {
        let mut screen = ListScreen::new(resource);
        screen.refresh(&client);
        Self {
            screen,
            client,
            pending_delete: None,
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if let Some(id) = self.pending_delete.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                let _ = self.screen.delete(&self.client, id);
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.screen.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.screen.select_prev(),
            KeyCode::Char(' ') => {
                if let Some(id) = self.screen.selected_record().map(|r| r.id) {
                    let _ = self.screen.toggle_status(&self.client, id);
                }
            }
            KeyCode::Char('x') => {
                self.screen.dismiss_banner();
                self.pending_delete = self.screen.selected_record().map(|r| r.id);
            }
            KeyCode::Char('r') => {
                self.screen.dismiss_banner();
                self.screen.refresh(&self.client);
            }
            _ => self.screen.dismiss_banner(),
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(theme::base()), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // banner
                Constraint::Min(0),    // list
                Constraint::Length(1), // hints
            ])
            .split(area);

        self.draw_banner(frame, chunks[0]);
        self.draw_list(frame, chunks[1]);
        statusbar::render(frame, chunks[2], statusbar::ADMIN_HINTS);
    }

    fn draw_banner(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(id) = self.pending_delete {
            Line::from(vec![
                Span::styled(format!(" Delete #{}? ", id), theme::red().add_modifier(Modifier::BOLD)),
                Span::styled("[y] confirm  any other key cancels", theme::dim()),
            ])
        } else if let Some(banner) = &self.screen.banner {
            let style = match banner.kind {
                BannerKind::Success => theme::green(),
                BannerKind::Error => theme::red(),
            };
            Line::from(Span::styled(format!(" {}", banner.message), style))
        } else {
            Line::from("")
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect) {
        let resource = self.screen.resource;
        let block = Block::default()
            .title(Span::styled(
                format!(" {} · {} ", resource.arabic_name(), resource.display_name()),
                theme::accent(),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border(true))
            .style(theme::surface());

        let records = match &self.screen.records {
            Fetch::Ready(records) => records,
            Fetch::Loading => {
                let p = Paragraph::new(Span::styled("  Loading…", theme::dim())).block(block);
                frame.render_widget(p, area);
                return;
            }
            Fetch::Failed(msg) => {
                let p = Paragraph::new(Span::styled(format!("  {}", msg), theme::red())).block(block);
                frame.render_widget(p, area);
                return;
            }
        };

        if records.is_empty() {
            let p = Paragraph::new(Span::styled("  لا توجد بيانات", theme::dim())).block(block);
            frame.render_widget(p, area);
            return;
        }

        let title_width = (area.width as usize).saturating_sub(22).max(8);
        let items: Vec<ListItem> = records
            .iter()
            .map(|record| {
                let status_style = if record.status { theme::green() } else { theme::dim() };
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {:>5} ", record.id), theme::dim()),
                    Span::styled(
                        format!("{} ", if record.status { "●" } else { "○" }),
                        status_style,
                    ),
                    Span::styled(fit_width(&record.title(resource), title_width), theme::bold()),
                    Span::styled(format!(" {}", record.status_label()), status_style),
                ]))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.screen.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(theme::selected());
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Browse one collection interactively.
pub fn run<T: Transport>(client: ApiClient<T>, resource: Resource) -> Result<()> {
    let mut app = AdminApp::new(client, resource);

    let mut terminal = ratatui::init();
    let events = EventHandler::new(std::time::Duration::from_millis(250));

    let result = (|| -> Result<()> {
        loop {
            terminal.draw(|frame| app.draw(frame))?;

            if let Event::Key(key) = events.next()? {
                app.handle_key(key);
                if app.should_quit {
                    break;
                }
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
    use crate::api::transport::fake::FakeTransport;
    use crate::api::transport::Method;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn listing() -> &'static str {
        r#"[{"id":1,"title":"أ","status":1},{"id":2,"title":"ب","status":0}]"#
    }

    #[test]
    fn space_toggles_selected_record() {
        let fake = FakeTransport::default()
            .respond(200, listing())
            .respond(200, "{}");
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut app = AdminApp::new(client, Resource::News);

        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Char(' ')));

        let request = fake.last();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.path, "/news/2/status");
        assert!(app.screen.records.ready().unwrap()[1].status);
    }

    #[test]
    fn delete_requires_confirmation() {
        let fake = FakeTransport::default()
            .respond(200, listing())
            .respond(200, "");
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut app = AdminApp::new(client, Resource::News);

        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Char('n')));
        assert_eq!(fake.count(), 1);
        assert_eq!(app.screen.records.ready().unwrap().len(), 2);

        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Char('y')));
        assert_eq!(fake.count(), 2);
        assert_eq!(fake.last().method, Method::Delete);
        assert_eq!(app.screen.records.ready().unwrap().len(), 1);
    }
}
