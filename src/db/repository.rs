use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

use crate::models::{DaySource, HijriStamp, PrayerDay, Session, Timings};

// ─── Cached calendar ─────────────────────────────────────────────────────────

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| anyhow!("Bad time '{}': {}", s, e))
}

fn fmt_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

struct DayRow {
    date: String,
    hijri: (u32, u32, u32, String, String),
    times: [String; 6],
    source: String,
}

fn read_day_row(row: &Row<'_>) -> rusqlite::Result<DayRow> {
    Ok(DayRow {
        date: row.get(0)?,
        hijri: (row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
        times: [
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
            row.get(11)?,
        ],
        source: row.get(12)?,
    })
}

impl DayRow {
    fn into_day(self) -> Result<PrayerDay> {
        let (day, month, year, month_name_ar, month_name_en) = self.hijri;
        let [fajr, sunrise, dhuhr, asr, maghrib, isha] = self.times;
        Ok(PrayerDay {
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .with_context(|| format!("Bad cached date '{}'", self.date))?,
            hijri: HijriStamp {
                day,
                month,
                year,
                month_name_ar,
                month_name_en,
            },
            timings: Timings {
                fajr: parse_time(&fajr)?,
                sunrise: parse_time(&sunrise)?,
                dhuhr: parse_time(&dhuhr)?,
                asr: parse_time(&asr)?,
                maghrib: parse_time(&maghrib)?,
                isha: parse_time(&isha)?,
            },
            source: DaySource::from_str(&self.source)?,
        })
    }
}

pub struct CalendarRepo;

impl CalendarRepo {
    /// Cached days in `[start, start + days)`, ordered by date. Gaps are simply absent.
    pub fn get_range(conn: &Connection, start: NaiveDate, days: u32) -> Result<Vec<PrayerDay>> {
        let end = start + Duration::days(days as i64 - 1);
        let mut stmt = conn.prepare(
            "SELECT date, hijri_day, hijri_month, hijri_year, hijri_name_ar, hijri_name_en,
                    fajr, sunrise, dhuhr, asr, maghrib, isha, source
             FROM calendar_days WHERE date >= ?1 AND date <= ?2
             ORDER BY date",
        )?;

        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            read_day_row,
        )?;

        let mut result = Vec::new();
        for r in rows {
            result.push(r?.into_day()?);
        }
        Ok(result)
    }

    pub fn store_days(conn: &Connection, days: &[PrayerDay]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO calendar_days
                (date, hijri_day, hijri_month, hijri_year, hijri_name_ar, hijri_name_en,
                 fajr, sunrise, dhuhr, asr, maghrib, isha, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        for day in days {
            stmt.execute(params![
                day.date.format("%Y-%m-%d").to_string(),
                day.hijri.day,
                day.hijri.month,
                day.hijri.year,
                day.hijri.month_name_ar,
                day.hijri.month_name_en,
                fmt_time(day.timings.fajr),
                fmt_time(day.timings.sunrise),
                fmt_time(day.timings.dhuhr),
                fmt_time(day.timings.asr),
                fmt_time(day.timings.maghrib),
                fmt_time(day.timings.isha),
                day.source.as_str(),
            ])?;
        }
        Ok(())
    }

    pub fn clear_all(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM calendar_days", [])?;
        Ok(())
    }

    /// Drop cached days computed under different settings. Returns true when cleared.
    pub fn sync_key(conn: &Connection, key: &str) -> Result<bool> {
        let stored = MetaRepo::get(conn, "calendar_key")?;
        if stored.as_deref() == Some(key) {
            return Ok(false);
        }
        if stored.is_some() {
            log::info!("Calendar settings changed; clearing cached days");
        }
        Self::clear_all(conn)?;
        MetaRepo::set(conn, "calendar_key", key)?;
        Ok(true)
    }

    /// Remove days before `date`.
    pub fn prune_before(conn: &Connection, date: NaiveDate) -> Result<usize> {
        let n = conn.execute(
            "DELETE FROM calendar_days WHERE date < ?1",
            params![date.format("%Y-%m-%d").to_string()],
        )?;
        Ok(n)
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct SessionRepo;

impl SessionRepo {
    pub fn store(conn: &Connection, session: &Session) -> Result<()> {
        conn.execute(
            "INSERT INTO session (id, token, user_json, remember, created_at)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                token = ?1, user_json = ?2, remember = ?3, created_at = ?4",
            params![
                session.token,
                serde_json::to_string(&session.user)?,
                session.remember as i32,
                session.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Current session, discarding it when it has expired.
    pub fn load(conn: &Connection, now: DateTime<Utc>, ttl: Duration) -> Result<Option<Session>> {
        let row = conn
            .query_row(
                "SELECT token, user_json, remember, created_at FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((token, user_json, remember, created_at)) = row else {
            return Ok(None);
        };
        let session = Session {
            token,
            user: serde_json::from_str(&user_json).context("Parsing stored user")?,
            remember: remember != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Bad session timestamp '{}'", created_at))?
                .with_timezone(&Utc),
        };

        if session.is_expired(now, ttl) {
            log::info!("Stored session expired; discarding");
            Self::clear(conn)?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn clear(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::test_conn;
    use crate::prayer_times::next::fixtures;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn cached_days_come_back_in_order() {
        let conn = test_conn();
        let mut days = fixtures::window(date(1), 5);
        days.reverse();
        CalendarRepo::store_days(&conn, &days).unwrap();

        let back = CalendarRepo::get_range(&conn, date(2), 3).unwrap();
        let dates: Vec<_> = back.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2), date(3), date(4)]);
        assert_eq!(back[0], fixtures::day(date(2)));
    }

    #[test]
    fn range_reports_gaps_by_omission() {
        let conn = test_conn();
        CalendarRepo::store_days(&conn, &fixtures::window(date(1), 3)).unwrap();
        assert_eq!(CalendarRepo::get_range(&conn, date(2), 5).unwrap().len(), 2);
    }

    #[test]
    fn changed_key_clears_cache() {
        let conn = test_conn();
        assert!(CalendarRepo::sync_key(&conn, "a").unwrap());
        CalendarRepo::store_days(&conn, &fixtures::window(date(1), 3)).unwrap();

        assert!(!CalendarRepo::sync_key(&conn, "a").unwrap());
        assert_eq!(CalendarRepo::get_range(&conn, date(1), 3).unwrap().len(), 3);

        assert!(CalendarRepo::sync_key(&conn, "b").unwrap());
        assert!(CalendarRepo::get_range(&conn, date(1), 3).unwrap().is_empty());
    }

    #[test]
    fn prune_drops_only_past_days() {
        let conn = test_conn();
        CalendarRepo::store_days(&conn, &fixtures::window(date(1), 5)).unwrap();
        assert_eq!(CalendarRepo::prune_before(&conn, date(3)).unwrap(), 2);
        assert_eq!(CalendarRepo::get_range(&conn, date(1), 5).unwrap().len(), 3);
    }

    #[test]
    fn remembered_session_survives() {
        let conn = test_conn();
        let session = Session::new("tok".into(), json!({"name": "Admin"}), true);
        SessionRepo::store(&conn, &session).unwrap();

        let later = session.created_at + Duration::days(30);
        let loaded = SessionRepo::load(&conn, later, Duration::hours(12)).unwrap().unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.user, json!({"name": "Admin"}));
    }

    #[test]
    fn expired_session_is_discarded() {
        let conn = test_conn();
        let session = Session::new("tok".into(), json!({}), false);
        SessionRepo::store(&conn, &session).unwrap();

        let soon = session.created_at + Duration::hours(1);
        assert!(SessionRepo::load(&conn, soon, Duration::hours(12)).unwrap().is_some());

        let later = session.created_at + Duration::hours(13);
        assert!(SessionRepo::load(&conn, later, Duration::hours(12)).unwrap().is_none());
        assert!(SessionRepo::load(&conn, soon, Duration::hours(12)).unwrap().is_none());
    }

    #[test]
    fn storing_again_replaces_the_session() {
        let conn = test_conn();
        SessionRepo::store(&conn, &Session::new("one".into(), json!({}), true)).unwrap();
        SessionRepo::store(&conn, &Session::new("two".into(), json!({}), true)).unwrap();
        let loaded = SessionRepo::load(&conn, Utc::now(), Duration::hours(1)).unwrap().unwrap();
        assert_eq!(loaded.token, "two");

        SessionRepo::clear(&conn).unwrap();
        assert!(SessionRepo::load(&conn, Utc::now(), Duration::hours(1)).unwrap().is_none());
    }

    #[test]
    fn meta_upserts() {
        let conn = test_conn();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap(), None);
        MetaRepo::set(&conn, "k", "1").unwrap();
        MetaRepo::set(&conn, "k", "2").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap().as_deref(), Some("2"));
    }
}
