use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::tui::theme;

pub const DASHBOARD_HINTS: &[(&str, &str)] = &[
    ("[c]", " calendar  "),
    ("[r]", " reload  "),
    ("[?]", " help  "),
    ("[Esc]", " quit"),
];

pub const ADMIN_HINTS: &[(&str, &str)] = &[
    ("[↑↓]", " move  "),
    ("[space]", " toggle status  "),
    ("[x]", " delete  "),
    ("[r]", " refresh  "),
    ("[Esc]", " quit"),
];

pub fn render(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(*key, theme::accent()));
        spans.push(Span::styled(*label, theme::dim()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
