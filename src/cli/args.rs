use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Resource;

#[derive(Parser, Debug)]
#[command(name = "minbar", version, author, about = "Prayer times and back-office console for an educational organization")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a day's prayer times and the countdown to the next prayer
    Times {
        /// Date to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the prayer calendar window starting today
    Calendar {
        /// Number of days, defaults to the configured window
        #[arg(long)]
        days: Option<u32>,
    },
    /// Detect the current location
    Locate {
        /// Store the detected location in the config file
        #[arg(long)]
        save: bool,
    },
    /// List the active records of a public collection
    Site {
        /// news, sections or home
        resource: Resource,
    },
    /// Sign in to the back office
    Login {
        #[arg(long)]
        email: String,
        /// Keep the session until logout
        #[arg(long)]
        remember: bool,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Back-office record management
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
    /// Print the config file path and current values
    Config,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List every record of a collection
    List { resource: Resource },
    /// Show one record
    Show { resource: Resource, id: i64 },
    /// Create a record
    Create {
        resource: Resource,
        /// Field value as name=value, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Update a record; unset fields keep their current values
    Update {
        resource: Resource,
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a record
    Delete {
        resource: Resource,
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Flip a record between active and inactive
    Toggle { resource: Resource, id: i64 },
    /// Browse a collection interactively
    Browse { resource: Resource },
}
