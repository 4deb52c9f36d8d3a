use ratatui::style::{Color, Modifier, Style};

pub const BG: Color = Color::Rgb(12, 20, 22);
pub const SURFACE: Color = Color::Rgb(20, 32, 35);
pub const BORDER: Color = Color::Rgb(44, 70, 74);
pub const TEXT: Color = Color::Rgb(222, 230, 226);
pub const TEXT_DIM: Color = Color::Rgb(112, 134, 130);
pub const ACCENT: Color = Color::Rgb(64, 178, 160);
pub const GOLD: Color = Color::Rgb(212, 175, 90);
pub const GREEN: Color = Color::Rgb(96, 170, 104);
pub const RED: Color = Color::Rgb(196, 88, 72);
pub const HIGHLIGHT: Color = Color::Rgb(32, 58, 60);

pub fn base() -> Style {
    Style::default().fg(TEXT).bg(BG)
}

pub fn surface() -> Style {
    Style::default().fg(TEXT).bg(SURFACE)
}

pub fn border(focused: bool) -> Style {
    Style::default().fg(if focused { ACCENT } else { BORDER })
}

pub fn dim() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn gold() -> Style {
    Style::default().fg(GOLD)
}

pub fn green() -> Style {
    Style::default().fg(GREEN)
}

pub fn red() -> Style {
    Style::default().fg(RED)
}

pub fn bold() -> Style {
    Style::default().fg(TEXT).add_modifier(Modifier::BOLD)
}

pub fn selected() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}
