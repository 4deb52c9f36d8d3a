use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{DaySource, HijriStamp, PrayerDay, PrayerName, Timings};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar API returned {code}: {status}")]
    Api { code: u16, status: String },
    #[error("malformed calendar data: {0}")]
    Parse(String),
    #[error("calendar has no entry for {0}")]
    MissingDay(NaiveDate),
    #[error("offline calculation failed: {0}")]
    Offline(String),
}

// ─── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    code: u16,
    #[serde(default)]
    status: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct WireDay {
    timings: HashMap<String, String>,
    date: WireDate,
}

#[derive(Debug, Deserialize)]
struct WireDate {
    gregorian: WireGregorian,
    hijri: WireHijri,
}

#[derive(Debug, Deserialize)]
struct WireGregorian {
    date: String,
}

#[derive(Debug, Deserialize)]
struct WireHijri {
    day: String,
    month: WireMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct WireMonth {
    number: u32,
    #[serde(default)]
    en: String,
    #[serde(default)]
    ar: String,
}

/// Parse an API timing such as `"05:12 (+03)"`, ignoring the zone suffix.
pub fn parse_timing(raw: &str) -> Result<NaiveTime, CalendarError> {
    let clock = raw.split_whitespace().next().unwrap_or_default();
    NaiveTime::parse_from_str(clock, "%H:%M")
        .map_err(|e| CalendarError::Parse(format!("bad timing '{}': {}", raw, e)))
}

fn parse_number(raw: &str, what: &str) -> Result<u32, CalendarError> {
    raw.trim()
        .parse()
        .map_err(|_| CalendarError::Parse(format!("bad hijri {} '{}'", what, raw)))
}

fn convert_day(wire: WireDay) -> Result<PrayerDay, CalendarError> {
    let date = NaiveDate::parse_from_str(&wire.date.gregorian.date, "%d-%m-%Y").map_err(|e| {
        CalendarError::Parse(format!("bad date '{}': {}", wire.date.gregorian.date, e))
    })?;

    let timing = |name: PrayerName| -> Result<NaiveTime, CalendarError> {
        let raw = wire
            .timings
            .get(name.api_key())
            .ok_or_else(|| CalendarError::Parse(format!("{} missing {}", date, name)))?;
        parse_timing(raw)
    };

    let timings = Timings {
        fajr: timing(PrayerName::Fajr)?,
        sunrise: timing(PrayerName::Sunrise)?,
        dhuhr: timing(PrayerName::Dhuhr)?,
        asr: timing(PrayerName::Asr)?,
        maghrib: timing(PrayerName::Maghrib)?,
        isha: timing(PrayerName::Isha)?,
    };
    if !timings.is_ordered() {
        log::warn!("Timings for {} are not in day order: {:?}", date, timings);
    }

    let hijri = wire.date.hijri;
    Ok(PrayerDay {
        date,
        hijri: HijriStamp {
            day: parse_number(&hijri.day, "day")?,
            month: hijri.month.number,
            year: parse_number(&hijri.year, "year")?,
            month_name_ar: hijri.month.ar,
            month_name_en: hijri.month.en,
        },
        timings,
        source: DaySource::Api,
    })
}

/// Parse a month calendar response body.
pub fn parse_calendar(body: &str) -> Result<Vec<PrayerDay>, CalendarError> {
    let response: CalendarResponse =
        serde_json::from_str(body).map_err(|e| CalendarError::Parse(e.to_string()))?;
    if response.code != 200 {
        let status = match response.data {
            Value::String(s) => format!("{} ({})", response.status, s),
            _ => response.status,
        };
        return Err(CalendarError::Api {
            code: response.code,
            status,
        });
    }
    let days: Vec<WireDay> =
        serde_json::from_value(response.data).map_err(|e| CalendarError::Parse(e.to_string()))?;
    days.into_iter().map(convert_day).collect()
}

/// Fetch every month touched by `[start, start + days)` once and cut out the window.
pub fn assemble_window<F>(
    start: NaiveDate,
    days: u32,
    mut fetch_month: F,
) -> Result<Vec<PrayerDay>, CalendarError>
where
    F: FnMut(i32, u32) -> Result<Vec<PrayerDay>, CalendarError>,
{
    if days == 0 {
        return Ok(Vec::new());
    }
    let last = start + Duration::days(days as i64 - 1);

    let mut by_date = BTreeMap::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        for day in fetch_month(year, month)? {
            if day.date >= start && day.date <= last {
                by_date.insert(day.date, day);
            }
        }
        if (year, month) >= (last.year(), last.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    (0..days as i64)
        .map(|i| {
            let date = start + Duration::days(i);
            by_date.remove(&date).ok_or(CalendarError::MissingDay(date))
        })
        .collect()
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

pub struct AladhanClient {
    http: reqwest::blocking::Client,
    url: String,
    latitude: f64,
    longitude: f64,
    method: u8,
    school: u8,
    timezone: String,
}

impl AladhanClient {
    pub fn new(config: &AppConfig) -> Result<Self, CalendarError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api.timeout_seconds))
            .user_agent(config.services.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            url: config.services.aladhan_url.clone(),
            latitude: config.location.latitude,
            longitude: config.location.longitude,
            method: config.calendar.method,
            school: school_for(&config.calendar.madhab),
            timezone: config.location.timezone.clone(),
        })
    }

    pub fn fetch_month(&self, year: i32, month: u32) -> Result<Vec<PrayerDay>, CalendarError> {
        log::info!("Fetching prayer calendar for {}-{:02}", year, month);
        let body = self
            .http
            .get(&self.url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("method", self.method.to_string()),
                ("school", self.school.to_string()),
                ("month", month.to_string()),
                ("year", year.to_string()),
                ("timezone", self.timezone.clone()),
                ("timezonestring", self.timezone.clone()),
            ])
            .send()?
            .text()?;
        parse_calendar(&body)
    }
}

/// Aladhan `school` parameter: 1 for Hanafi Asr, 0 otherwise.
pub fn school_for(madhab: &str) -> u8 {
    if madhab.eq_ignore_ascii_case("hanafi") { 1 } else { 0 }
}
