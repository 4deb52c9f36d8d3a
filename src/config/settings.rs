use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides `api.base_url` when set.
pub const API_URL_ENV: &str = "MINBAR_API_URL";

fn default_organization() -> String {
    "المدرسة".to_string()
}
fn default_latitude() -> f64 {
    24.7136
}
fn default_longitude() -> f64 {
    46.6753
}
fn default_location_name() -> String {
    "Riyadh".to_string()
}
fn default_timezone() -> String {
    "Asia/Riyadh".to_string()
}
fn default_timezone_offset() -> i32 {
    180
}
fn default_method() -> u8 {
    4
}
fn default_madhab() -> String {
    "Shafi".to_string()
}
fn default_window_days() -> u32 {
    20
}
fn default_hijri_offset() -> i32 {
    0
}
fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_timeout_seconds() -> u64 {
    15
}
fn default_max_upload_kb() -> u64 {
    2048
}
fn default_session_ttl_hours() -> i64 {
    12
}
fn default_aladhan_url() -> String {
    "https://api.aladhan.com/v1/calendar".to_string()
}
fn default_ip_geolocation_url() -> String {
    "https://ipapi.co/json/".to_string()
}
fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}
fn default_user_agent() -> String {
    format!("minbar/{}", env!("CARGO_PKG_VERSION"))
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_name")]
    pub name: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// IANA name passed to the calendar API.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
    /// Try IP geolocation before the coordinates above.
    #[serde(default = "default_true")]
    pub auto_detect: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
            timezone_offset: default_timezone_offset(),
            auto_detect: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Aladhan calculation method id (4 = Umm al-Qura).
    #[serde(default = "default_method")]
    pub method: u8,
    #[serde(default = "default_madhab")]
    pub madhab: String,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Compute timings locally when the calendar API is unreachable.
    #[serde(default = "default_true")]
    pub offline_fallback: bool,
    /// Days to add/subtract from offline Hijri dates for local moon sighting.
    #[serde(default = "default_hijri_offset")]
    pub hijri_offset: i32,
}

impl CalendarConfig {
    pub fn window(&self) -> u32 {
        self.window_days.clamp(1, 31)
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            madhab: default_madhab(),
            window_days: default_window_days(),
            offline_fallback: true,
            hijri_offset: default_hijri_offset(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_upload_kb")]
    pub max_upload_kb: u64,
    /// Lifetime of sessions created without "remember me".
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_upload_kb: default_max_upload_kb(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_aladhan_url")]
    pub aladhan_url: String,
    #[serde(default = "default_ip_geolocation_url")]
    pub ip_geolocation_url: String,
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            aladhan_url: default_aladhan_url(),
            ip_geolocation_url: default_ip_geolocation_url(),
            nominatim_url: default_nominatim_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            location: LocationConfig::default(),
            calendar: CalendarConfig::default(),
            api: ApiConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "minbar")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("minbar.db"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            log::debug!("API base URL overridden by {}", API_URL_ENV);
            self.api.base_url = url;
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Current wall-clock time at the configured UTC offset.
    pub fn local_now(&self) -> NaiveDateTime {
        let offset =
            FixedOffset::east_opt(self.location.timezone_offset * 60).unwrap_or(Utc.fix());
        Utc::now().with_timezone(&offset).naive_local()
    }

    /// Identifies the calendar settings; cached days are only valid for the same key.
    pub fn calendar_key(&self) -> String {
        format!(
            "{:.4},{:.4},{},{},{},{}",
            self.location.latitude,
            self.location.longitude,
            self.calendar.method,
            self.calendar.madhab,
            self.location.timezone,
            self.calendar.hijri_offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config = AppConfig::parse(
            r#"
            [location]
            name = "Makkah"
            latitude = 21.4225

            [api]
            base_url = "https://school.example/api"
            "#,
        )
        .unwrap();
        assert_eq!(config.location.name, "Makkah");
        assert_eq!(config.location.longitude, default_longitude());
        assert_eq!(config.calendar.window_days, 20);
        assert!(config.calendar.offline_fallback);
        assert_eq!(config.api.base_url, "https://school.example/api");
        assert_eq!(config.api.timeout_seconds, 15);
    }

    #[test]
    fn env_overrides_base_url_unless_blank() {
        let mut config = AppConfig::default();
        config.apply_env(Some("  ".into()));
        assert_eq!(config.api.base_url, default_base_url());
        config.apply_env(Some("https://other.example/api".into()));
        assert_eq!(config.api.base_url, "https://other.example/api");
    }

    #[test]
    fn window_is_clamped() {
        let mut calendar = CalendarConfig::default();
        calendar.window_days = 0;
        assert_eq!(calendar.window(), 1);
        calendar.window_days = 90;
        assert_eq!(calendar.window(), 31);
    }

    #[test]
    fn calendar_key_tracks_location_and_method() {
        let a = AppConfig::default();
        let mut b = AppConfig::default();
        assert_eq!(a.calendar_key(), b.calendar_key());
        b.calendar.method = 3;
        assert_ne!(a.calendar_key(), b.calendar_key());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = AppConfig::parse(&text).unwrap();
        assert_eq!(back.calendar_key(), config.calendar_key());
        assert_eq!(back.organization, config.organization);
    }
}
