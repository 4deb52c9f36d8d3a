use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{NextPrayer, PrayerDay, PrayerName};

/// Position of `date` within the window.
pub fn today_index(window: &[PrayerDay], date: NaiveDate) -> Option<usize> {
    window.iter().position(|day| day.date == date)
}

/// Soonest timing strictly after `now`, scanning the selected day in order and
/// rolling over to the following day's Fajr. Looks no further than one day ahead;
/// returns `None` when the window has no following day.
pub fn next_prayer(now: NaiveDateTime, window: &[PrayerDay], today: usize) -> Option<NextPrayer> {
    let day = window.get(today)?;

    let found = PrayerName::ALL
        .iter()
        .map(|name| (*name, day.at(*name)))
        .find(|(_, at)| *at > now);

    let (name, at) = match found {
        Some(hit) => hit,
        None => {
            let tomorrow = window.get(today + 1)?;
            if Some(tomorrow.date) != day.date.succ_opt() {
                log::warn!(
                    "Calendar window jumps from {} to {}; no next Fajr",
                    day.date,
                    tomorrow.date
                );
                return None;
            }
            let fajr = tomorrow.at(PrayerName::Fajr);
            if fajr <= now {
                return None;
            }
            (PrayerName::Fajr, fajr)
        }
    };

    Some(NextPrayer {
        name,
        arabic_label: name.arabic_label(),
        icon: name.icon(),
        time: at,
        remaining_secs: (at - now).num_seconds(),
    })
}

/// Locate today by `now`'s date, then find the next prayer.
pub fn next_prayer_at(now: NaiveDateTime, window: &[PrayerDay]) -> Option<NextPrayer> {
    let today = today_index(window, now.date())?;
    next_prayer(now, window, today)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{hm, window};
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn picks_first_timing_after_now() {
        let w = window(date(), 3);
        let now = date().and_time(hm(17, 0));
        let next = next_prayer(now, &w, 0).unwrap();
        assert_eq!(next.name, PrayerName::Maghrib);
        assert_eq!(next.time, date().and_time(hm(18, 0)));
        assert_eq!(next.arabic_label, "المغرب");
        assert_eq!(next.countdown(), "01:00:00");
    }

    #[test]
    fn sunrise_counts_as_a_timing() {
        let w = window(date(), 1);
        let now = date().and_time(hm(5, 30));
        assert_eq!(next_prayer(now, &w, 0).unwrap().name, PrayerName::Sunrise);
    }

    #[test]
    fn exact_timing_is_not_next() {
        let w = window(date(), 1);
        let now = date().and_time(hm(12, 15));
        assert_eq!(next_prayer(now, &w, 0).unwrap().name, PrayerName::Asr);
    }

    #[test]
    fn after_isha_rolls_to_tomorrows_fajr() {
        let w = window(date(), 2);
        let now = date().and_time(hm(21, 0));
        let next = next_prayer(now, &w, 0).unwrap();
        assert_eq!(next.name, PrayerName::Fajr);
        assert_eq!(next.time, date().succ_opt().unwrap().and_time(hm(5, 0)));
        assert_eq!(next.countdown(), "08:00:00");
    }

    #[test]
    fn exhausted_window_yields_nothing() {
        let w = window(date(), 1);
        let now = date().and_time(hm(21, 0));
        assert!(next_prayer(now, &w, 0).is_none());
        assert!(next_prayer(now, &w, 5).is_none());
    }

    #[test]
    fn non_consecutive_next_day_is_rejected() {
        let mut w = window(date(), 1);
        w.extend(window(date() + chrono::Duration::days(3), 1));
        let now = date().and_time(hm(21, 0));
        assert!(next_prayer(now, &w, 0).is_none());
    }

    #[test]
    fn today_is_located_by_date() {
        let w = window(date(), 5);
        let now = (date() + chrono::Duration::days(2)).and_time(hm(13, 0));
        assert_eq!(today_index(&w, now.date()), Some(2));
        assert_eq!(next_prayer_at(now, &w).unwrap().name, PrayerName::Asr);

        let outside = (date() - chrono::Duration::days(1)).and_time(hm(13, 0));
        assert!(next_prayer_at(outside, &w).is_none());
    }

    #[test]
    fn countdown_strictly_decreases_until_rollover() {
        let w = window(date(), 2);
        let start = date().and_time(hm(19, 29));
        let mut last = i64::MAX;
        for s in 0..60 {
            let now = start + chrono::Duration::seconds(s);
            let next = next_prayer(now, &w, 0).unwrap();
            assert_eq!(next.name, PrayerName::Isha);
            assert!(next.remaining_secs < last);
            assert_eq!(next.countdown().len(), 8);
            last = next.remaining_secs;
        }
        let rolled = next_prayer(date().and_time(hm(19, 30)), &w, 0).unwrap();
        assert_eq!(rolled.name, PrayerName::Fajr);
        assert!(rolled.remaining_secs > last);
    }
}
