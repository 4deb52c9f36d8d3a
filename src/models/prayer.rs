use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Wall-clock order within a day.
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    pub fn arabic_label(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "الفجر",
            PrayerName::Sunrise => "الشروق",
            PrayerName::Dhuhr => "الظهر",
            PrayerName::Asr => "العصر",
            PrayerName::Maghrib => "المغرب",
            PrayerName::Isha => "العشاء",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "☾",
            PrayerName::Sunrise => "☀",
            PrayerName::Dhuhr => "☼",
            PrayerName::Asr => "◐",
            PrayerName::Maghrib => "◒",
            PrayerName::Isha => "★",
        }
    }

    /// Key used by the Aladhan `timings` object.
    pub fn api_key(&self) -> &'static str {
        self.display_name()
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub fajr: NaiveTime,
    pub sunrise: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
}

impl Timings {
    pub fn get(&self, name: PrayerName) -> NaiveTime {
        match name {
            PrayerName::Fajr => self.fajr,
            PrayerName::Sunrise => self.sunrise,
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Asr => self.asr,
            PrayerName::Maghrib => self.maghrib,
            PrayerName::Isha => self.isha,
        }
    }

    /// Timings in day order, paired with their names.
    pub fn ordered(&self) -> [(PrayerName, NaiveTime); 6] {
        PrayerName::ALL.map(|name| (name, self.get(name)))
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered().windows(2).all(|pair| pair[0].1 < pair[1].1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriStamp {
    pub day: u32,
    pub month: u32,
    pub year: u32,
    pub month_name_ar: String,
    pub month_name_en: String,
}

impl HijriStamp {
    pub fn formatted(&self) -> String {
        format!("{} {} {}", self.day, self.month_name_en, self.year)
    }

    pub fn formatted_ar(&self) -> String {
        format!("{} {} {} هـ", self.day, self.month_name_ar, self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaySource {
    Api,
    Offline,
}

impl DaySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaySource::Api => "api",
            DaySource::Offline => "offline",
        }
    }
}

impl FromStr for DaySource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(DaySource::Api),
            "offline" => Ok(DaySource::Offline),
            _ => Err(anyhow::anyhow!("Unknown calendar source: {}", s)),
        }
    }
}

/// One calendar day of prayer timings, local to the calendar's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerDay {
    pub date: NaiveDate,
    pub hijri: HijriStamp,
    pub timings: Timings,
    pub source: DaySource,
}

impl PrayerDay {
    pub fn at(&self, name: PrayerName) -> NaiveDateTime {
        self.date.and_time(self.timings.get(name))
    }
}

/// Derived every tick, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPrayer {
    pub name: PrayerName,
    pub arabic_label: &'static str,
    pub icon: &'static str,
    pub time: NaiveDateTime,
    pub remaining_secs: i64,
}

impl NextPrayer {
    pub fn countdown(&self) -> String {
        crate::utils::format::format_countdown(self.remaining_secs)
    }
}
