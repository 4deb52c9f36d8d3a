use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use hijri_date::HijriDate;

use crate::models::HijriStamp;

/// Islamic month names in English (index 0 = Muharram = month 1)
const HIJRI_MONTH_NAMES: &[&str] = &[
    "Muharram",
    "Safar",
    "Rabi' al-Awwal",
    "Rabi' al-Thani",
    "Jumada al-Awwal",
    "Jumada al-Thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

const HIJRI_MONTH_NAMES_AR: &[&str] = &[
    "مُحَرَّم",
    "صَفَر",
    "رَبيع الأوّل",
    "رَبيع الثاني",
    "جُمادى الأولى",
    "جُمادى الآخرة",
    "رَجَب",
    "شَعْبان",
    "رَمَضان",
    "شَوّال",
    "ذوالقعدة",
    "ذوالحجة",
];

fn month_name(names: &[&'static str], month: usize) -> &'static str {
    if (1..=12).contains(&month) {
        names[month - 1]
    } else {
        "Unknown"
    }
}

/// Hijri date for a Gregorian day, shifted by `offset_days` for local moon sighting.
pub fn hijri_for(date: NaiveDate, offset_days: i32) -> Result<HijriStamp> {
    let adjusted = date + Duration::days(offset_days as i64);
    let hd = HijriDate::from_gr(
        adjusted.year() as usize,
        adjusted.month() as usize,
        adjusted.day() as usize,
    )
    .map_err(|e| anyhow::anyhow!("Hijri conversion error: {}", e))?;

    let month = hd.month();
    Ok(HijriStamp {
        day: hd.day() as u32,
        month: month as u32,
        year: hd.year() as u32,
        month_name_ar: month_name(HIJRI_MONTH_NAMES_AR, month).to_string(),
        month_name_en: month_name(HIJRI_MONTH_NAMES, month).to_string(),
    })
}
