use chrono::NaiveDateTime;
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem},
    Frame,
};

use crate::models::{NextPrayer, PrayerDay, PrayerName};
use crate::tui::theme;
use crate::utils::format::{format_time, format_time_12h_ar};

pub fn render(
    frame: &mut Frame,
    area: Rect,
    day: Option<&PrayerDay>,
    now: NaiveDateTime,
    next: Option<&NextPrayer>,
) {
    let block = Block::default()
        .title(Span::styled(" مواقيت الصلاة · Prayer times ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let Some(day) = day else {
        let list = List::new(vec![ListItem::new(Span::styled("  No timings for today", theme::dim()))])
            .block(block);
        frame.render_widget(list, area);
        return;
    };

    let next_name: Option<PrayerName> = next
        .filter(|n| n.time.date() == day.date)
        .map(|n| n.name);

    let items: Vec<ListItem> = day
        .timings
        .ordered()
        .iter()
        .map(|(name, time)| {
            let passed = day.date.and_time(*time) <= now;
            let is_next = next_name == Some(*name);

            let (marker, name_style) = if is_next {
                ("▶", theme::gold().add_modifier(Modifier::BOLD))
            } else if passed {
                (" ", theme::dim())
            } else {
                (" ", theme::bold())
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", marker), theme::gold()),
                Span::styled(format!("{} ", name.icon()), theme::accent()),
                Span::styled(format!("{:<8}", name.display_name()), name_style),
                Span::styled(format!("{:<8}", name.arabic_label()), name_style),
                Span::styled(format!("{:<7}", format_time(*time)), theme::dim()),
                Span::styled(format_time_12h_ar(*time), theme::dim()),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
