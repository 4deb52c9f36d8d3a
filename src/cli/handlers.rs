use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use rusqlite::Connection;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::admin::{self, Form};
use crate::api::transport::HttpTransport;
use crate::api::{ApiClient, ApiError};
use crate::cli::args::AdminCommands;
use crate::config::settings::API_URL_ENV;
use crate::config::AppConfig;
use crate::geo::{self, Locator};
use crate::models::{DaySource, PrayerName, Record, Resource};
use crate::prayer_times::offline::CALC_METHODS;
use crate::prayer_times::{next_prayer_at, CalendarLoader};
use crate::utils::format::{fit_width, format_time, format_time_12h_ar, pad_width};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

// ─── Location ────────────────────────────────────────────────────────────────

/// Replace the configured coordinates with a detected location for this run.
pub fn apply_detected_location(conn: &Connection, config: &mut AppConfig) {
    if !config.location.auto_detect {
        return;
    }
    let resolved = match Locator::new(config) {
        Ok(locator) => locator.resolve(),
        Err(e) => {
            log::warn!("Location detection unavailable: {:#}", e);
            return;
        }
    };
    match geo::locator::settle(conn, resolved) {
        Ok(location) => location.apply_to(config),
        Err(e) => log::warn!("Could not reuse detected location: {:#}", e),
    }
}

pub fn handle_locate(config: &mut AppConfig, save: bool) -> Result<()> {
    let resolved = Locator::new(config)?.resolve();

    println!();
    println_colored!(GOLD, "  {}", resolved.display_name());
    println_colored!(
        DIM,
        "  {:.4}, {:.4}  via {}",
        resolved.latitude,
        resolved.longitude,
        resolved.source.as_str()
    );
    if let Some(tz) = &resolved.timezone {
        println_colored!(DIM, "  Timezone {}", tz);
    }

    if save {
        resolved.apply_to(config);
        // A saved location is authoritative from now on.
        config.location.auto_detect = false;
        config.save()?;
        println_colored!(GREEN, "  ✓ Saved to {}", AppConfig::config_path()?.display());
        println_colored!(DIM, "  Automatic detection turned off; set location.auto_detect to re-enable");
    }
    println!();
    Ok(())
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub fn handle_times(conn: &Connection, config: &AppConfig, date: Option<NaiveDate>) -> Result<()> {
    let now = config.local_now();
    let date = date.unwrap_or(now.date());

    let window = CalendarLoader::new(conn, config).load_window(date)?;
    let day = window
        .first()
        .ok_or_else(|| anyhow!("No timings available for {}", date))?;

    println!();
    println_colored!(
        GOLD,
        "  {} · {} ({})",
        config.organization,
        config.location.name,
        date.format("%A %d %B %Y")
    );
    println_colored!(DIM, "  {}", day.hijri.formatted_ar());
    if day.source == DaySource::Offline {
        println_colored!(AMBER, "  Computed offline; the calendar service was unreachable");
    }
    println!();

    let next = if date == now.date() {
        next_prayer_at(now, &window)
    } else {
        None
    };

    for (name, time) in day.timings.ordered() {
        let line = format!(
            "  {} {} {}  {}  {}",
            name.icon(),
            pad_width(name.display_name(), 8),
            pad_width(name.arabic_label(), 6),
            format_time(time),
            format_time_12h_ar(time)
        );
        let is_next = next
            .as_ref()
            .is_some_and(|n| n.name == name && n.time.date() == date);
        if is_next {
            println_colored!(AMBER, "{}", line);
        } else if date == now.date() && day.date.and_time(time) <= now {
            println_colored!(DIM, "{}", line);
        } else {
            println_colored!(BOLD, "{}", line);
        }
    }

    if let Some(next) = next {
        println!();
        println_colored!(
            AMBER,
            "  Next: {} ({}) in {}",
            next.name.display_name(),
            next.arabic_label,
            next.countdown()
        );
    }
    println!();
    Ok(())
}

pub fn handle_calendar(conn: &Connection, config: &AppConfig, days: Option<u32>) -> Result<()> {
    let mut config = config.clone();
    if let Some(days) = days {
        config.calendar.window_days = days;
    }
    let today = config.local_now().date();
    let window = CalendarLoader::new(conn, &config).load_window(today)?;

    println!();
    println_colored!(GOLD, "  Prayer calendar · {}", config.location.name);
    println!();

    let mut header = format!("  {}  {}", pad_width("Date", 10), pad_width("Hijri", 16));
    for name in PrayerName::ALL {
        header.push_str(&format!(" {}", pad_width(name.display_name(), 7)));
    }
    println_colored!(DIM, "{}", header);

    for day in &window {
        let mut line = format!(
            "  {}  {}",
            day.date.format("%Y-%m-%d"),
            pad_width(&fit_width(&day.hijri.formatted(), 16), 16)
        );
        for (_, time) in day.timings.ordered() {
            line.push_str(&format!(" {}", pad_width(&format_time(time), 7)));
        }
        if day.source == DaySource::Offline {
            line.push_str("  *");
        }
        if day.date == today {
            println_colored!(BOLD, "{}", line);
        } else {
            println!("{}", line);
        }
    }
    if window.iter().any(|d| d.source == DaySource::Offline) {
        println!();
        println_colored!(DIM, "  * computed offline");
    }
    println!();
    Ok(())
}

// ─── Public site ─────────────────────────────────────────────────────────────

pub fn handle_site(config: &AppConfig, resource: Resource) -> Result<()> {
    if !resource.is_public() {
        bail!(
            "{} is not shown on the public site (try: news, sections, home)",
            resource
        );
    }
    let client = ApiClient::from_config(config, None).map_err(api_error)?;
    let records = client.list_public(resource).map_err(api_error)?;

    println!();
    println_colored!(GOLD, "  {} · {}", resource.arabic_name(), resource.display_name());
    println!();
    if records.is_empty() {
        println_colored!(DIM, "  لا توجد بيانات");
    }
    for record in &records {
        println_colored!(BOLD, "  {}", record.title(resource));
        let summary = ["content", "description"]
            .iter()
            .find_map(|f| record.text(f));
        if let Some(summary) = summary {
            println_colored!(DIM, "    {}", fit_width(&summary.replace('\n', " "), 72));
        }
    }
    println!();
    Ok(())
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub fn handle_login(conn: &Connection, config: &AppConfig, email: &str, remember: bool) -> Result<()> {
    let password = prompt_hidden("  Password: ")?;
    if email.trim().is_empty() || password.is_empty() {
        bail!("Email and password are required");
    }
    let client = ApiClient::from_config(config, None).map_err(api_error)?;
    match admin::auth::login(conn, &client, email, &password, remember) {
        Ok(session) => {
            println_colored!(GREEN, "  ✓ Signed in as {}", session.user_label());
            if !remember {
                println_colored!(
                    DIM,
                    "  Session expires after {} hours; use --remember to keep it",
                    config.api.session_ttl_hours
                );
            }
            Ok(())
        }
        Err(e) => {
            println_colored!(RED, "  ✗ {}", e.user_message());
            Err(anyhow!(e))
        }
    }
}

pub fn handle_logout(conn: &Connection, config: &AppConfig) -> Result<()> {
    let Some(session) = admin::auth::current_session(conn, config)? else {
        println_colored!(DIM, "  Not signed in.");
        return Ok(());
    };
    let client = ApiClient::from_config(config, Some(&session)).map_err(api_error)?;
    match admin::auth::logout(conn, &client)? {
        None => println_colored!(GREEN, "  ✓ Signed out"),
        Some(e) => println_colored!(
            AMBER,
            "  Signed out locally; the server did not confirm ({})",
            e.user_message()
        ),
    }
    Ok(())
}

pub fn handle_whoami(conn: &Connection, config: &AppConfig) -> Result<()> {
    match admin::auth::current_session(conn, config)? {
        Some(session) => {
            println_colored!(BOLD, "  {}", session.user_label());
            let kind = if session.remember { "remembered" } else { "temporary" };
            println_colored!(
                DIM,
                "  {} session since {}",
                kind,
                session.created_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => println_colored!(DIM, "  Not signed in."),
    }
    Ok(())
}

// ─── Admin ───────────────────────────────────────────────────────────────────

pub fn handle_admin(conn: &Connection, config: &AppConfig, action: AdminCommands) -> Result<()> {
    let client = admin_client(conn, config)?;

    match action {
        AdminCommands::List { resource } => {
            let records = client.list(resource).map_err(api_error)?;
            println!();
            println_colored!(GOLD, "  {} · {}", resource.arabic_name(), resource.display_name());
            println!();
            if records.is_empty() {
                println_colored!(DIM, "  لا توجد بيانات");
            }
            for record in &records {
                let line = format!(
                    "  {:>5}  {}  {}",
                    record.id,
                    pad_width(&fit_width(&record.title(resource), 48), 48),
                    record.status_label()
                );
                if record.status {
                    println!("{}", line);
                } else {
                    println_colored!(DIM, "{}", line);
                }
            }
            println!();
        }
        AdminCommands::Show { resource, id } => {
            let record = client.get(resource, id).map_err(api_error)?;
            print_record(resource, &record);
        }
        AdminCommands::Create { resource, set, image } => {
            let mut form = Form::new(resource);
            fill_form(&mut form, &set, image)?;
            let created = submit(&mut form, &client)?;
            println_colored!(GREEN, "  ✓ تمت الإضافة بنجاح");
            if let Some(record) = created {
                print_record(resource, &record);
            }
        }
        AdminCommands::Update { resource, id, set, image } => {
            let current = client.get(resource, id).map_err(api_error)?;
            let mut form = Form::edit(resource, &current);
            fill_form(&mut form, &set, image)?;
            submit(&mut form, &client)?;
            println_colored!(GREEN, "  ✓ تم التعديل بنجاح");
        }
        AdminCommands::Delete { resource, id, yes } => {
            if !yes {
                let answer = prompt(&format!("  Delete {} #{}? [y/N] ", resource, id))?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    println_colored!(DIM, "  Cancelled.");
                    return Ok(());
                }
            }
            client.delete(resource, id).map_err(api_error)?;
            println_colored!(GREEN, "  ✓ تم الحذف بنجاح");
        }
        AdminCommands::Toggle { resource, id } => {
            let record = client.get(resource, id).map_err(api_error)?;
            let active = !record.status;
            client.set_status(resource, id, active).map_err(api_error)?;
            println_colored!(
                GREEN,
                "  ✓ {} #{} is now {}",
                resource,
                id,
                if active { "active" } else { "inactive" }
            );
        }
        AdminCommands::Browse { resource } => {
            crate::tui::admin::run(client, resource)?;
        }
    }
    Ok(())
}

fn admin_client(conn: &Connection, config: &AppConfig) -> Result<ApiClient<HttpTransport>> {
    let session = admin::auth::current_session(conn, config)?.ok_or_else(|| {
        anyhow!("Not signed in. Run `minbar login --email <address>` first")
    })?;
    ApiClient::from_config(config, Some(&session)).map_err(api_error)
}

fn fill_form(form: &mut Form, assignments: &[String], image: Option<PathBuf>) -> Result<()> {
    for raw in assignments {
        let (name, value) = parse_assignment(raw)?;
        form.set(&name, &value)?;
    }
    if let Some(path) = image {
        form.image = Some(path);
    }
    Ok(())
}

fn submit(form: &mut Form, client: &ApiClient<HttpTransport>) -> Result<Option<Record>> {
    match form.submit(client) {
        Ok(record) => Ok(record),
        Err(e) => {
            println_colored!(RED, "  ✗ {}", e.user_message());
            for (field, message) in &form.errors {
                let label = form.resource.field(field).map_or(field.as_str(), |f| f.label);
                println_colored!(RED, "    {}: {}", label, message);
            }
            Err(anyhow!(e))
        }
    }
}

fn print_record(resource: Resource, record: &Record) {
    println!();
    println_colored!(GOLD, "  {} #{}  ({})", resource.display_name(), record.id, record.status_label());
    for spec in resource.fields() {
        let value = record.text(spec.name).unwrap_or_default();
        println!("  {}  {}", pad_width(spec.label, 14), value);
    }
    for (name, value) in &record.fields {
        if resource.field(name).is_none() && !value.is_null() {
            let value = record.text(name).unwrap_or_default();
            println_colored!(DIM, "  {}  {}", pad_width(name, 14), fit_width(&value, 60));
        }
    }
    println!();
}

/// Split `name=value`; the value may itself contain `=`.
fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing field name in '{}'", raw);
    }
    Ok((name.to_string(), value.to_string()))
}

fn api_error(e: ApiError) -> anyhow::Error {
    let message = e.user_message();
    anyhow!(e).context(message)
}

// ─── Config ──────────────────────────────────────────────────────────────────

pub fn handle_config(config: &AppConfig) -> Result<()> {
    let path = AppConfig::config_path()?;
    println!();
    println_colored!(GOLD, "  {}", path.display());
    if !path.exists() {
        println_colored!(DIM, "  (not created yet; showing defaults)");
    }
    if std::env::var(API_URL_ENV).is_ok() {
        println_colored!(AMBER, "  api.base_url overridden by {}", API_URL_ENV);
    }
    let method = CALC_METHODS
        .iter()
        .find(|(id, _)| *id == config.calendar.method)
        .map_or("custom", |(_, name)| *name);
    println_colored!(DIM, "  Calculation method {}: {}", config.calendar.method, method);
    println!();
    let content = toml::to_string_pretty(config).context("Serializing config")?;
    for line in content.lines() {
        println!("  {}", line);
    }
    println!();
    Ok(())
}

// ─── Prompts ─────────────────────────────────────────────────────────────────

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

/// Read a line without echoing it.
fn prompt_hidden(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    terminal::enable_raw_mode()?;
    let read = read_hidden();
    terminal::disable_raw_mode()?;
    println!();
    read
}

fn read_hidden() -> Result<String> {
    let mut buf = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(buf),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("Cancelled")
            }
            KeyCode::Char(c) => buf.push(c),
            KeyCode::Esc => bail!("Cancelled"),
            _ => {}
        }
    }
}
