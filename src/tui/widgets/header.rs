use chrono::NaiveDateTime;
use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::models::HijriStamp;
use crate::tui::theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    organization: &str,
    location: &str,
    hijri: Option<&HijriStamp>,
    now: NaiveDateTime,
) {
    let title_line = Line::from(vec![
        Span::styled(format!("  {}  ", organization), theme::accent().add_modifier(Modifier::BOLD)),
        Span::styled("·  ", theme::dim()),
        Span::styled(location.to_string(), theme::gold()),
    ]);

    let hijri_str = hijri
        .map(|h| h.formatted_ar())
        .unwrap_or_else(|| "—".to_string());
    let date_line = Line::from(vec![
        Span::styled(hijri_str, theme::gold()),
        Span::styled("  ·  ", theme::dim()),
        Span::styled(now.format("%A, %d %b %Y").to_string(), theme::dim()),
        Span::styled("  ·  ", theme::dim()),
        Span::styled(now.format("%H:%M:%S").to_string(), theme::bold()),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::accent())
        .style(theme::base());

    let paragraph = Paragraph::new(vec![title_line, Line::from(""), date_line])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
