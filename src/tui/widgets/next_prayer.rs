use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use tui_big_text::{BigText, PixelSize};

use crate::models::NextPrayer;
use crate::tui::theme;
use crate::utils::format::format_time;

/// What the countdown panel can show besides a countdown.
pub enum Placeholder<'a> {
    Loading,
    Failed(&'a str),
    NoData,
}

pub fn render(frame: &mut Frame, area: Rect, next: Result<&NextPrayer, Placeholder<'_>>) {
    let block = Block::default()
        .title(Span::styled(" الصلاة القادمة · Next prayer ", theme::gold()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(true))
        .style(theme::surface());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let next = match next {
        Ok(next) => next,
        Err(placeholder) => {
            let line = match placeholder {
                Placeholder::Loading => Line::from(Span::styled("  Loading calendar…", theme::dim())),
                Placeholder::Failed(msg) => Line::from(vec![
                    Span::styled("  Calendar unavailable: ", theme::red()),
                    Span::styled(msg.to_string(), theme::dim()),
                ]),
                Placeholder::NoData => {
                    Line::from(Span::styled("  No upcoming timing in the calendar", theme::dim()))
                }
            };
            frame.render_widget(Paragraph::new(vec![Line::from(""), line]), inner);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // name
            Constraint::Length(4), // countdown
            Constraint::Min(0),
        ])
        .split(inner);

    let title = Line::from(vec![
        Span::styled(format!("  {} ", next.icon), theme::accent()),
        Span::styled(
            format!("{}  {}", next.name.display_name().to_uppercase(), next.arabic_label),
            theme::gold().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  at {}", format_time(next.time.time())), theme::dim()),
    ]);
    frame.render_widget(Paragraph::new(vec![Line::from(""), title]), rows[0]);

    let countdown = BigText::builder()
        .pixel_size(PixelSize::Quadrant)
        .style(theme::bold())
        .lines(vec![Line::from(format!(" {}", next.countdown()))])
        .build();
    frame.render_widget(countdown, rows[1]);
}
