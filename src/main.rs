mod admin;
mod api;
mod cli;
mod config;
mod db;
mod geo;
mod models;
mod prayer_times;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::migrations::run_migrations;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Loading config")?;

    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    // Run migrations on every startup
    run_migrations(&conn)?;

    match cli.command {
        Some(Commands::Times { date }) => {
            handlers::apply_detected_location(&conn, &mut config);
            handlers::handle_times(&conn, &config, date)?;
        }
        Some(Commands::Calendar { days }) => {
            handlers::apply_detected_location(&conn, &mut config);
            handlers::handle_calendar(&conn, &config, days)?;
        }
        Some(Commands::Locate { save }) => {
            handlers::handle_locate(&mut config, save)?;
        }
        Some(Commands::Site { resource }) => {
            handlers::handle_site(&config, resource)?;
        }
        Some(Commands::Login { email, remember }) => {
            handlers::handle_login(&conn, &config, &email, remember)?;
        }
        Some(Commands::Logout) => {
            handlers::handle_logout(&conn, &config)?;
        }
        Some(Commands::Whoami) => {
            handlers::handle_whoami(&conn, &config)?;
        }
        Some(Commands::Admin { action }) => {
            handlers::handle_admin(&conn, &config, action)?;
        }
        Some(Commands::Config) => {
            handlers::handle_config(&config)?;
        }

        // No subcommand → prayer dashboard
        None => {
            handlers::apply_detected_location(&conn, &mut config);
            tui::app::run(conn, config)?;
        }
    }

    Ok(())
}
