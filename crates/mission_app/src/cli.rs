use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use mission_domain::{
    dates::{parse_date, MonthRef},
    habit::{HabitDuration, ReminderTime},
};

#[derive(Debug, Parser)]
#[command(name = "habitjoy", version, about = "Track daily missions and watch the month fill up")]
pub struct Cli {
    /// Directory holding the saved missions (overrides HABITJOY_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start a new mission.
    Add {
        name: String,
        /// Daily reminder, HH:MM.
        #[arg(long)]
        reminder: Option<ReminderTime>,
        /// `all` for the whole viewed month, or a number of days from today.
        #[arg(long, default_value = "all")]
        duration: HabitDuration,
    },
    /// Delete a mission. Its history is kept.
    Delete { id: String },
    /// Mark or unmark a mission for a day (today by default).
    Toggle {
        id: String,
        /// YYYY-MM-DD, zero-padded.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// List missions in display order.
    List,
    /// Monthly progress, YYYY-MM (current month by default).
    Stats {
        #[arg(long)]
        month: Option<MonthRef>,
    },
    /// Week grid of completions.
    Week {
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<i64>,
    },
    /// Show reminders, or the ones due at a given minute.
    Reminders {
        #[arg(long)]
        at: Option<ReminderTime>,
    },
    /// Show or change the font theme.
    Theme { choice: Option<ThemeChoice> },
    /// Delete every mission and all progress.
    Reset {
        /// Confirm the wipe.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Clean,
    Cartoon,
    Toggle,
}
