use chrono::NaiveTime;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Format a countdown in seconds as zero-padded "HH:MM:SS".
/// Hours do not wrap at 24 and negative input clamps to zero.
pub fn format_countdown(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format a NaiveTime to "HH:MM"
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Format a NaiveTime to 12-hour clock with Arabic AM/PM markers
pub fn format_time_12h_ar(t: NaiveTime) -> String {
    let marker = if t.format("%p").to_string() == "AM" { "ص" } else { "م" };
    format!("{} {}", t.format("%I:%M"), marker)
}

/// Truncate to a display width, appending an ellipsis when cut.
pub fn fit_width(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return pad_width(s, width);
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    pad_width(&out, width)
}

/// Right-pad with spaces to a display width.
pub fn pad_width(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_is_zero_padded() {
        assert_eq!(format_countdown(0), "00:00:00");
        assert_eq!(format_countdown(59), "00:00:59");
        assert_eq!(format_countdown(3600), "01:00:00");
        assert_eq!(format_countdown(3 * 3600 + 7 * 60 + 5), "03:07:05");
    }

    #[test]
    fn countdown_does_not_wrap_or_go_negative() {
        assert_eq!(format_countdown(25 * 3600), "25:00:00");
        assert_eq!(format_countdown(-5), "00:00:00");
    }

    #[test]
    fn twelve_hour_markers() {
        let morning = NaiveTime::from_hms_opt(5, 7, 0).unwrap();
        let evening = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        assert_eq!(format_time_12h_ar(morning), "05:07 ص");
        assert_eq!(format_time_12h_ar(evening), "06:30 م");
    }

    #[test]
    fn fit_width_truncates_and_pads() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdefgh", 5), "abcd…");
        assert_eq!(UnicodeWidthStr::width(fit_width("الأخبار اليومية للمدرسة", 10).as_str()), 10);
    }
}
