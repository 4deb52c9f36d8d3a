use chrono::NaiveDate;
use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table},
    Frame,
};

use crate::models::{DaySource, PrayerDay, PrayerName};
use crate::tui::theme;
use crate::utils::format::format_time;

pub fn render(frame: &mut Frame, area: Rect, window: &[PrayerDay], today: NaiveDate) {
    let offline = window.iter().any(|d| d.source == DaySource::Offline);
    let title = if offline {
        " Calendar (partly computed offline) "
    } else {
        " Calendar "
    };
    let block = Block::default()
        .title(Span::styled(title, theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let mut header_cells = vec![Cell::from("Date"), Cell::from("Hijri")];
    header_cells.extend(PrayerName::ALL.iter().map(|p| Cell::from(p.arabic_label())));
    let header = Row::new(header_cells).style(theme::gold());

    let rows: Vec<Row> = window
        .iter()
        .map(|day| {
            let mut cells = vec![
                Cell::from(day.date.format("%a %d %b").to_string()),
                Cell::from(format!("{} {}", day.hijri.day, day.hijri.month_name_ar)),
            ];
            cells.extend(
                day.timings
                    .ordered()
                    .iter()
                    .map(|(_, t)| Cell::from(format_time(*t))),
            );
            let style = if day.date == today {
                theme::selected()
            } else if day.source == DaySource::Offline {
                theme::dim()
            } else {
                theme::base()
            };
            Row::new(cells).style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(11), Constraint::Length(18)];
    widths.extend(std::iter::repeat(Constraint::Length(7)).take(PrayerName::ALL.len()));

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}
