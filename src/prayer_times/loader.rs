use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::repository::CalendarRepo;
use crate::models::PrayerDay;
use crate::prayer_times::calendar::{assemble_window, AladhanClient, CalendarError};
use crate::prayer_times::offline::OfflineCalculator;

/// Produces the calendar window starting at a given day: cache first, then the
/// calendar API, then local calculation when allowed.
pub struct CalendarLoader<'a> {
    conn: &'a Connection,
    config: &'a AppConfig,
}

impl<'a> CalendarLoader<'a> {
    pub fn new(conn: &'a Connection, config: &'a AppConfig) -> Self {
        Self { conn, config }
    }

    pub fn load_window(&self, start: NaiveDate) -> Result<Vec<PrayerDay>> {
        let client = AladhanClient::new(self.config)?;
        self.load_window_with(start, |year, month| client.fetch_month(year, month))
    }

    pub fn load_window_with<F>(&self, start: NaiveDate, fetch_month: F) -> Result<Vec<PrayerDay>>
    where
        F: FnMut(i32, u32) -> Result<Vec<PrayerDay>, CalendarError>,
    {
        let days = self.config.calendar.window();
        CalendarRepo::sync_key(self.conn, &self.config.calendar_key())?;
        CalendarRepo::prune_before(self.conn, start - Duration::days(1))?;

        let cached = CalendarRepo::get_range(self.conn, start, days)?;
        if cached.len() == days as usize {
            log::debug!("Calendar window {} (+{} days) served from cache", start, days);
            return Ok(cached);
        }

        match assemble_window(start, days, fetch_month) {
            Ok(window) => {
                CalendarRepo::store_days(self.conn, &window)?;
                Ok(window)
            }
            Err(e) if self.config.calendar.offline_fallback => {
                log::warn!("Calendar fetch failed ({}); computing timings offline", e);
                self.fill_offline(start, days, cached)
            }
            Err(e) => Err(e).context("Fetching prayer calendar"),
        }
    }

    /// Offline days are never cached so the next load retries the API.
    fn fill_offline(
        &self,
        start: NaiveDate,
        days: u32,
        cached: Vec<PrayerDay>,
    ) -> Result<Vec<PrayerDay>> {
        let calc = OfflineCalculator::new(self.config)?;
        let mut cached = cached.into_iter().peekable();
        let mut window = Vec::with_capacity(days as usize);
        for i in 0..days as i64 {
            let date = start + Duration::days(i);
            match cached.next_if(|d| d.date == date) {
                Some(day) => window.push(day),
                None => window.push(calc.day(date)?),
            }
        }
        Ok(window)
    }
}
