use chrono::{FixedOffset, NaiveDate, NaiveTime, Timelike};
use salah::prelude::*;

use crate::config::AppConfig;
use crate::models::{DaySource, PrayerDay, Timings};
use crate::prayer_times::calendar::CalendarError;
use crate::utils::hijri::hijri_for;

/// Local astronomical calculation used when the calendar API is unreachable.
pub struct OfflineCalculator {
    pub lat: f64,
    pub lng: f64,
    pub method_id: u8,
    pub madhab_str: String,
    pub tz_offset_minutes: i32,
    pub hijri_offset: i32,
}

impl OfflineCalculator {
    pub fn new(config: &AppConfig) -> Result<Self, CalendarError> {
        // Validate madhab early
        parse_madhab(&config.calendar.madhab)?;
        Ok(Self {
            lat: config.location.latitude,
            lng: config.location.longitude,
            method_id: config.calendar.method,
            madhab_str: config.calendar.madhab.clone(),
            tz_offset_minutes: config.location.timezone_offset,
            hijri_offset: config.calendar.hijri_offset,
        })
    }

    pub fn day(&self, date: NaiveDate) -> Result<PrayerDay, CalendarError> {
        let coords = Coordinates::new(self.lat, self.lng);
        let method = method_for(self.method_id);
        let madhab = parse_madhab(&self.madhab_str)?;
        let params = Configuration::with(method, madhab);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(coords)
            .with_configuration(params)
            .calculate()
            .map_err(|e| CalendarError::Offline(format!("Prayer calculation failed: {}", e)))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60).ok_or_else(|| {
            CalendarError::Offline(format!("Invalid timezone offset: {}", self.tz_offset_minutes))
        })?;

        // The calendar API reports whole minutes.
        let to_local = |utc: chrono::DateTime<chrono::Utc>| -> NaiveTime {
            let t = utc.with_timezone(&offset).time();
            t.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(t)
        };

        let hijri = hijri_for(date, self.hijri_offset)
            .map_err(|e| CalendarError::Offline(e.to_string()))?;

        Ok(PrayerDay {
            date,
            hijri,
            timings: Timings {
                fajr: to_local(times.time(Prayer::Fajr)),
                sunrise: to_local(times.time(Prayer::Sunrise)),
                dhuhr: to_local(times.time(Prayer::Dhuhr)),
                asr: to_local(times.time(Prayer::Asr)),
                maghrib: to_local(times.time(Prayer::Maghrib)),
                isha: to_local(times.time(Prayer::Isha)),
            },
            source: DaySource::Offline,
        })
    }
}

/// Map an Aladhan method id onto the closest `salah` method.
pub fn method_for(id: u8) -> Method {
    match id {
        1 => Method::Karachi,
        2 => Method::NorthAmerica,
        3 => Method::MuslimWorldLeague,
        4 => Method::UmmAlQura,
        5 => Method::Egyptian,
        7 => Method::Tehran,
        8 => Method::Dubai,
        9 => Method::Kuwait,
        10 => Method::Qatar,
        11 => Method::Singapore,
        13 => Method::Turkey,
        15 => Method::MoonsightingCommittee,
        other => {
            log::warn!("No offline equivalent for method {}; using MuslimWorldLeague", other);
            Method::MuslimWorldLeague
        }
    }
}

/// Case-insensitive, matching the `school` parameter sent to the calendar API.
fn parse_madhab(s: &str) -> Result<Madhab, CalendarError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "hanafi" => Ok(Madhab::Hanafi),
        "shafi" | "shafi'i" | "shafii" => Ok(Madhab::Shafi),
        _ => Err(CalendarError::Offline(format!("Unknown madhab: '{}'", s))),
    }
}

/// Aladhan method ids with a label, for `config` output.
pub const CALC_METHODS: &[(u8, &str)] = &[
    (1, "University of Islamic Sciences, Karachi"),
    (2, "Islamic Society of North America"),
    (3, "Muslim World League"),
    (4, "Umm Al-Qura University, Makkah"),
    (5, "Egyptian General Authority of Survey"),
    (7, "Institute of Geophysics, University of Tehran"),
    (8, "Gulf Region"),
    (9, "Kuwait"),
    (10, "Qatar"),
    (11, "Majlis Ugama Islam Singapura"),
    (13, "Diyanet İşleri Başkanlığı, Turkey"),
    (15, "Moonsighting Committee Worldwide"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_an_ordered_day() {
        let calc = OfflineCalculator::new(&AppConfig::default()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let day = calc.day(date).unwrap();
        assert_eq!(day.date, date);
        assert_eq!(day.source, DaySource::Offline);
        assert!(day.timings.is_ordered());
        assert_eq!(day.timings.fajr.second(), 0);
    }

    #[test]
    fn unknown_madhab_is_rejected() {
        let mut config = AppConfig::default();
        config.calendar.madhab = "Zahiri".into();
        assert!(OfflineCalculator::new(&config).is_err());
    }

    #[test]
    fn madhab_is_case_insensitive() {
        for raw in ["hanafi", "HANAFI", " Hanafi "] {
            assert!(matches!(parse_madhab(raw), Ok(Madhab::Hanafi)));
        }
        assert!(matches!(parse_madhab("shafi'i"), Ok(Madhab::Shafi)));

        let mut config = AppConfig::default();
        config.calendar.madhab = "hanafi".into();
        let calc = OfflineCalculator::new(&config).unwrap();
        let day = calc.day(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).unwrap();
        assert!(day.timings.is_ordered());
    }
}
