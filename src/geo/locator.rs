use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::repository::MetaRepo;

const LAST_DETECTED_KEY: &str = "last_detected_location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    IpLookup,
    Configured,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::IpLookup => "IP geolocation",
            LocationSource::Configured => "configured coordinates",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub source: LocationSource,
}

impl ResolvedLocation {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{:.4}, {:.4}", self.latitude, self.longitude))
    }

    /// Write the resolved values into the location section of `config`.
    pub fn apply_to(&self, config: &mut AppConfig) {
        config.location.name = self.display_name();
        config.location.latitude = self.latitude;
        config.location.longitude = self.longitude;
        if let Some(tz) = &self.timezone {
            config.location.timezone = tz.clone();
        }
        if let Some(offset) = self.utc_offset_minutes {
            config.location.timezone_offset = offset;
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    timezone: Option<String>,
    utc_offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<ReverseAddress>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
}

/// Parse an offset such as `+0300` or `-0530` into minutes.
pub fn parse_utc_offset(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let (sign, digits) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

pub fn parse_ip_lookup(body: &str) -> Result<ResolvedLocation> {
    let response: IpLookupResponse =
        serde_json::from_str(body).context("Parsing IP geolocation response")?;
    if response.error {
        return Err(anyhow!(
            "IP geolocation refused: {}",
            response.reason.unwrap_or_else(|| "unknown reason".into())
        ));
    }
    let (Some(latitude), Some(longitude)) = (response.latitude, response.longitude) else {
        return Err(anyhow!("IP geolocation returned no coordinates"));
    };
    Ok(ResolvedLocation {
        name: response.city.filter(|c| !c.trim().is_empty()),
        latitude,
        longitude,
        timezone: response.timezone,
        utc_offset_minutes: response.utc_offset.as_deref().and_then(parse_utc_offset),
        source: LocationSource::IpLookup,
    })
}

/// Most specific place name in a reverse-geocoding response.
pub fn parse_reverse(body: &str) -> Result<String> {
    let response: ReverseResponse =
        serde_json::from_str(body).context("Parsing reverse geocoding response")?;
    response
        .address
        .and_then(|a| a.city.or(a.town).or(a.village).or(a.state))
        .or(response.display_name)
        .ok_or_else(|| anyhow!("Reverse geocoding returned no place name"))
}

/// Pick a location: IP lookup when enabled, else the configured coordinates; then
/// fill a missing name by reverse geocoding.
pub fn resolve_with<I, R>(config: &AppConfig, ip_lookup: I, reverse: R) -> ResolvedLocation
where
    I: FnOnce() -> Result<ResolvedLocation>,
    R: FnOnce(f64, f64) -> Result<String>,
{
    let configured = || ResolvedLocation {
        name: Some(config.location.name.clone()).filter(|n| !n.trim().is_empty()),
        latitude: config.location.latitude,
        longitude: config.location.longitude,
        timezone: None,
        utc_offset_minutes: None,
        source: LocationSource::Configured,
    };

    let mut location = if config.location.auto_detect {
        match ip_lookup() {
            Ok(found) => found,
            Err(e) => {
                log::warn!("IP geolocation failed ({:#}); using configured coordinates", e);
                configured()
            }
        }
    } else {
        configured()
    };

    if location.name.is_none() {
        match reverse(location.latitude, location.longitude) {
            Ok(name) => location.name = Some(name),
            Err(e) => log::warn!("Reverse geocoding failed: {:#}", e),
        }
    }
    location
}

/// Remember a successful detection, and answer a failed one with the last
/// detected location instead of the configured coordinates. Keeps the calendar
/// cache key stable while the lookup service is intermittently unreachable.
pub fn settle(conn: &Connection, resolved: ResolvedLocation) -> Result<ResolvedLocation> {
    match resolved.source {
        LocationSource::IpLookup => {
            let raw = serde_json::to_string(&resolved).context("Serializing location")?;
            MetaRepo::set(conn, LAST_DETECTED_KEY, &raw)?;
            Ok(resolved)
        }
        LocationSource::Configured => match MetaRepo::get(conn, LAST_DETECTED_KEY)? {
            Some(raw) => {
                let last: ResolvedLocation =
                    serde_json::from_str(&raw).context("Parsing remembered location")?;
                log::info!("Using last detected location {}", last.display_name());
                Ok(last)
            }
            None => Ok(resolved),
        },
    }
}

pub struct Locator<'a> {
    http: reqwest::blocking::Client,
    config: &'a AppConfig,
}

impl<'a> Locator<'a> {
    pub fn new(config: &'a AppConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api.timeout_seconds))
            .user_agent(config.services.user_agent.clone())
            .build()
            .context("Building HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn resolve(&self) -> ResolvedLocation {
        resolve_with(
            self.config,
            || self.ip_lookup(),
            |lat, lon| self.reverse(lat, lon),
        )
    }

    fn ip_lookup(&self) -> Result<ResolvedLocation> {
        log::debug!("GET {}", self.config.services.ip_geolocation_url);
        let body = self
            .http
            .get(&self.config.services.ip_geolocation_url)
            .send()?
            .error_for_status()?
            .text()?;
        parse_ip_lookup(&body)
    }

    fn reverse(&self, lat: f64, lon: f64) -> Result<String> {
        log::debug!("GET {} ({}, {})", self.config.services.nominatim_url, lat, lon);
        let body = self
            .http
            .get(&self.config.services.nominatim_url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("accept-language", "ar".to_string()),
            ])
            .send()?
            .error_for_status()?
            .text()?;
        parse_reverse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_BODY: &str = r#"{
        "ip": "203.0.113.7", "city": "Jeddah", "region": "Makkah Region",
        "country_name": "Saudi Arabia", "latitude": 21.5433, "longitude": 39.1728,
        "timezone": "Asia/Riyadh", "utc_offset": "+0300"
    }"#;

    #[test]
    fn utc_offsets() {
        assert_eq!(parse_utc_offset("+0300"), Some(180));
        assert_eq!(parse_utc_offset("-0530"), Some(-330));
        assert_eq!(parse_utc_offset("+05:45"), Some(345));
        assert_eq!(parse_utc_offset("0100"), Some(60));
        assert_eq!(parse_utc_offset("UTC"), None);
        assert_eq!(parse_utc_offset(""), None);
    }

    #[test]
    fn ip_lookup_body() {
        let loc = parse_ip_lookup(IP_BODY).unwrap();
        assert_eq!(loc.name.as_deref(), Some("Jeddah"));
        assert_eq!(loc.utc_offset_minutes, Some(180));
        assert_eq!(loc.timezone.as_deref(), Some("Asia/Riyadh"));
        assert_eq!(loc.source, LocationSource::IpLookup);
    }

    #[test]
    fn ip_lookup_error_body() {
        assert!(parse_ip_lookup(r#"{"error": true, "reason": "RateLimited"}"#).is_err());
    }

    #[test]
    fn reverse_prefers_city_then_town() {
        let body = r#"{"display_name": "long name", "address": {"town": "العلا", "state": "المدينة"}}"#;
        assert_eq!(parse_reverse(body).unwrap(), "العلا");
        let body = r#"{"display_name": "somewhere"}"#;
        assert_eq!(parse_reverse(body).unwrap(), "somewhere");
        assert!(parse_reverse("{}").is_err());
    }

    #[test]
    fn falls_back_to_configured_coordinates() {
        let config = AppConfig::default();
        let loc = resolve_with(
            &config,
            || Err(anyhow!("offline")),
            |_, _| panic!("configured name is present"),
        );
        assert_eq!(loc.source, LocationSource::Configured);
        assert_eq!(loc.latitude, config.location.latitude);
        assert_eq!(loc.display_name(), config.location.name);
    }

    #[test]
    fn missing_name_is_reverse_geocoded() {
        let mut config = AppConfig::default();
        config.location.auto_detect = false;
        config.location.name = String::new();
        let loc = resolve_with(
            &config,
            || panic!("auto detection disabled"),
            |_, _| Ok("الرياض".to_string()),
        );
        assert_eq!(loc.name.as_deref(), Some("الرياض"));
    }

    #[test]
    fn failed_lookup_reuses_last_detection() {
        let conn = crate::db::migrations::test_conn();
        let config = AppConfig::default();
        let configured = || {
            resolve_with(&config, || Err(anyhow!("timeout")), |_, _| unreachable!())
        };

        // Nothing detected yet: configured coordinates.
        let first = settle(&conn, configured()).unwrap();
        assert_eq!(first.source, LocationSource::Configured);

        let detected = settle(&conn, parse_ip_lookup(IP_BODY).unwrap()).unwrap();
        assert_eq!(detected.source, LocationSource::IpLookup);

        let mut flaky = config.clone();
        let again = settle(&conn, configured()).unwrap();
        assert_eq!(again.source, LocationSource::IpLookup);
        assert_eq!(again.name, detected.name);
        again.apply_to(&mut flaky);

        let mut online = config.clone();
        detected.apply_to(&mut online);
        assert_eq!(flaky.calendar_key(), online.calendar_key());
    }

    #[test]
    fn ip_result_is_applied_to_config() {
        let mut config = AppConfig::default();
        let loc = resolve_with(&config, || parse_ip_lookup(IP_BODY), |_, _| unreachable!());
        loc.apply_to(&mut config);
        assert_eq!(config.location.name, "Jeddah");
        assert_eq!(config.location.latitude, 21.5433);
        assert_eq!(config.location.timezone_offset, 180);
    }
}
