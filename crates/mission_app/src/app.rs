use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mission_domain::{
    clock::SystemClock,
    dates::format_date,
    habit::HabitId,
    metrics::Dashboard,
    notifications::{self, NotificationSink, ReminderRequest},
    preferences::FontTheme,
    store::FileStore,
    HabitRepository,
};
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ThemeChoice};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) log_filter: String,
    pub(crate) week_offset: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABITJOY_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Some(filter) = lookup("HABITJOY_LOG").or_else(|| lookup("RUST_LOG")) {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }
        if let Some(offset) = lookup("HABITJOY_WEEK_START_OFFSET") {
            if let Ok(value) = offset.trim().parse::<i64>() {
                config.week_offset = value;
            }
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".habitjoy"),
            log_filter: "warn".to_string(),
            week_offset: 0,
        }
    }
}

pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("unable to open data directory {}", config.data_dir.display()))?;
    info!(data_dir = %config.data_dir.display(), "opening habit store");
    let repo = HabitRepository::builder()
        .with_store(Box::new(store))
        .with_clock(Box::new(SystemClock))
        .build();

    let mut out = io::stdout().lock();
    execute(&repo, &config, command, &mut out)?;
    if let Some(err) = repo.take_persist_error() {
        warn!(%err, "changes kept in memory only");
        writeln!(out, "warning: changes were not saved: {err}")?;
    }
    Ok(())
}

/// Collects reminders so they can be written out after dispatch.
#[derive(Default)]
struct BufferedSink {
    pending: Mutex<Vec<ReminderRequest>>,
}

impl NotificationSink for BufferedSink {
    fn notify(&self, reminder: ReminderRequest) {
        self.pending.lock().push(reminder);
    }
}

impl BufferedSink {
    fn drain(self) -> Vec<ReminderRequest> {
        self.pending.into_inner()
    }
}

pub fn execute(
    repo: &HabitRepository,
    config: &AppConfig,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Add {
            name,
            reminder,
            duration,
        } => {
            let habit = repo
                .add_habit(&name, reminder, duration)
                .context("unable to add mission")?;
            writeln!(
                out,
                "Added mission `{}` ({}), {}",
                habit.name,
                habit.id,
                habit.duration.label()
            )?;
        }
        Command::Delete { id } => {
            let id = HabitId::new(id);
            if repo.delete_habit(&id) {
                writeln!(out, "Deleted mission {id}")?;
            } else {
                writeln!(out, "No mission with id {id}")?;
            }
        }
        Command::Toggle { id, date } => {
            let today = repo.today();
            let date = date.unwrap_or(today);
            if date > today {
                bail!("cannot complete a mission on {}, it is in the future", format_date(date));
            }
            let id = HabitId::new(id);
            if repo.habit(&id).is_none() {
                warn!(habit_id = %id, "toggling a mission that no longer exists");
            }
            let verb = if repo.toggle_completion(&id, date) {
                "Marked"
            } else {
                "Cleared"
            };
            writeln!(out, "{verb} {id} on {}", format_date(date))?;
        }
        Command::List => render_list(repo, out)?,
        Command::Stats { month } => {
            let dashboard = match month {
                Some(month) => repo.dashboard_for(month),
                None => repo.dashboard(),
            };
            render_dashboard(&dashboard, out)?;
        }
        Command::Week { offset } => {
            render_week(repo, offset.unwrap_or(config.week_offset), out)?;
        }
        Command::Reminders { at: Some(at) } => {
            let sink = BufferedSink::default();
            let sent = notifications::dispatch_due(&repo.habits(), at.time(), &sink);
            info!(sent, at = %at, "reminders dispatched");
            render_reminders(sink.drain(), out)?;
        }
        Command::Reminders { at: None } => {
            let entries = repo.reminder_entries();
            if entries.is_empty() {
                writeln!(out, "No reminders set.")?;
            }
            for entry in entries {
                writeln!(out, "{}  {}", entry.reminder_time, entry.name)?;
            }
        }
        Command::Theme { choice } => {
            let theme = match choice {
                None => repo.font_theme(),
                Some(ThemeChoice::Toggle) => repo.toggle_font_theme(),
                Some(ThemeChoice::Clean) => {
                    repo.set_font_theme(FontTheme::Clean);
                    FontTheme::Clean
                }
                Some(ThemeChoice::Cartoon) => {
                    repo.set_font_theme(FontTheme::Cartoon);
                    FontTheme::Cartoon
                }
            };
            writeln!(out, "Font theme: {theme}")?;
        }
        Command::Reset { yes } => {
            if !yes {
                writeln!(
                    out,
                    "This deletes every mission and all progress. Re-run with --yes to confirm."
                )?;
                return Ok(());
            }
            repo.reset_all();
            writeln!(out, "The board is clean! Time for a new hunt!")?;
        }
    }
    Ok(())
}

fn render_list(repo: &HabitRepository, out: &mut impl Write) -> Result<()> {
    let snapshot = repo.snapshot();
    if snapshot.habits.is_empty() {
        writeln!(out, "No missions yet. Add one with `habitjoy add <name>`.")?;
        return Ok(());
    }
    let today = repo.today();
    for habit in &snapshot.habits {
        let done = if snapshot.completions.is_completed(&habit.id, today) {
            "[x]"
        } else {
            "[ ]"
        };
        let reminder = habit
            .reminder_time
            .map(|time| time.to_string())
            .unwrap_or_else(|| "ALL DAY".to_string());
        writeln!(
            out,
            "{done} {}  {}  [{}]  {}  since {}",
            habit.id,
            habit.name,
            reminder,
            habit.duration.label(),
            format_date(habit.start_date)
        )?;
    }
    Ok(())
}

fn render_dashboard(dashboard: &Dashboard, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", dashboard.month)?;
    writeln!(out, "TOTAL GOALS     {}", dashboard.total_goals)?;
    writeln!(out, "FLOW RATE       {}", dashboard.monthly_rate)?;
    writeln!(
        out,
        "MISSION SCORE   {} ({})",
        dashboard.overall_score,
        dashboard.tier.label()
    )?;
    writeln!(out, "CHEESE EARNED   {}", dashboard.total_completions)?;
    writeln!(out, "{}", dashboard.mood.message())?;

    if !dashboard.summaries.is_empty() {
        writeln!(out)?;
        for summary in &dashboard.summaries {
            writeln!(
                out,
                "{:<24} {:>4}  {} / {} ({})",
                summary.name, summary.percentage, summary.count, summary.total_days, summary.duration_label
            )?;
        }
    }

    writeln!(out)?;
    for point in dashboard.daily.iter().filter(|point| point.completed_count > 0) {
        writeln!(
            out,
            "{}  done {:>2}  total {:>3}  {:>4}",
            format_date(point.date),
            point.completed_count,
            point.cumulative_count,
            point.rate
        )?;
    }
    Ok(())
}

fn render_week(repo: &HabitRepository, offset: i64, out: &mut impl Write) -> Result<()> {
    let Some(week) = repo.week(offset) else {
        bail!("week offset {offset} is outside the calendar");
    };
    let habits = repo.habits();
    let width = habits
        .iter()
        .map(|habit| habit.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(8);

    write!(out, "{:<width$}", "")?;
    for (name, day) in DAY_NAMES.iter().zip(&week) {
        let marker = if day.is_today { '*' } else { ' ' };
        write!(out, " {name}{marker}")?;
    }
    writeln!(out)?;

    for habit in &habits {
        write!(out, "{:<width$}", habit.name)?;
        for day in &week {
            let cell = if day.is_future {
                " -  "
            } else if repo.is_completed(&habit.id, day.date) {
                " [x]"
            } else {
                " [ ]"
            };
            write!(out, " {cell}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn render_reminders(due: Vec<ReminderRequest>, out: &mut impl Write) -> Result<()> {
    for reminder in due {
        writeln!(out, "{}: {}", reminder.title, reminder.body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use mission_domain::{
        clock::FixedClock,
        habit::{HabitDuration, ReminderTime},
        store::MemoryStore,
    };

    fn repo() -> HabitRepository {
        HabitRepository::builder()
            .with_store(Box::new(MemoryStore::new()))
            .with_clock(Box::new(FixedClock::new(
                FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2026, 1, 7, 9, 0, 0)
                    .unwrap(),
            )))
            .build()
    }

    fn run_command(repo: &HabitRepository, command: Command) -> Result<String> {
        let mut out = Vec::new();
        execute(repo, &AppConfig::default(), command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn config_reads_overrides() {
        let config = AppConfig::from_lookup(|name| match name {
            "HABITJOY_DATA_DIR" => Some("/tmp/joy".to_string()),
            "RUST_LOG" => Some("debug".to_string()),
            "HABITJOY_WEEK_START_OFFSET" => Some(" -1 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/joy"));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.week_offset, -1);

        let garbage = AppConfig::from_lookup(|name| {
            (name == "HABITJOY_WEEK_START_OFFSET").then(|| "soon".to_string())
        })
        .unwrap();
        assert_eq!(garbage.week_offset, 0);

        let config = config.with_data_dir(Some(PathBuf::from("elsewhere")));
        assert_eq!(config.data_dir(), Path::new("elsewhere"));
    }

    #[test]
    fn add_toggle_and_stats() {
        let repo = repo();
        let added = run_command(
            &repo,
            Command::Add {
                name: "Read".into(),
                reminder: None,
                duration: HabitDuration::days(7).unwrap(),
            },
        )
        .unwrap();
        assert!(added.contains("Added mission `Read`"));
        let id = repo.habits()[0].id.to_string();

        let toggled = run_command(&repo, Command::Toggle { id, date: None }).unwrap();
        assert!(toggled.starts_with("Marked"));
        assert!(toggled.ends_with("on 2026-01-07\n"));
        let stats = run_command(&repo, Command::Stats { month: None }).unwrap();
        assert!(stats.starts_with("January 2026"));
        assert!(stats.contains("MISSION SCORE   14% (Just Warmup)"));
        assert!(stats.contains("2026-01-07  done  1  total   1  100%"));
    }

    #[test]
    fn stats_for_another_month_keeps_the_view() {
        let repo = repo();
        let habit = repo.add_habit("Read", None, HabitDuration::Unbounded).unwrap();
        repo.toggle_completion(&habit.id, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

        let december = run_command(
            &repo,
            Command::Stats {
                month: "2025-12".parse().ok(),
            },
        )
        .unwrap();
        assert!(december.starts_with("December 2025"));
        assert!(december.contains("FLOW RATE       3%"));
        assert!(december.contains("2025-12-31  done  1"));
        assert_eq!(repo.viewed_month().to_string(), "January 2026");
    }

    #[test]
    fn list_marks_today() {
        let repo = repo();
        assert!(run_command(&repo, Command::List).unwrap().starts_with("No missions yet"));
        let read = repo.add_habit("Read", None, HabitDuration::Unbounded).unwrap();
        repo.add_habit("Stretch", ReminderTime::from_hm(7, 30), HabitDuration::Unbounded)
            .unwrap();
        repo.toggle_completion(&read.id, NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());

        let listed = run_command(&repo, Command::List).unwrap();
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[x] "));
        assert!(lines[0].contains("Read  [ALL DAY]  Full Month  since 2026-01-07"));
        assert!(lines[1].starts_with("[ ] "));
        assert!(lines[1].contains("Stretch  [07:30]"));
    }

    #[test]
    fn future_toggles_are_refused() {
        let repo = repo();
        let result = run_command(
            &repo,
            Command::Toggle {
                id: "1".into(),
                date: NaiveDate::from_ymd_opt(2026, 1, 8),
            },
        );
        assert!(result.is_err());
        assert!(repo.completions().is_empty());
    }

    #[test]
    fn reset_requires_confirmation() {
        let repo = repo();
        repo.add_habit("Read", None, HabitDuration::Unbounded).unwrap();
        let refused = run_command(&repo, Command::Reset { yes: false }).unwrap();
        assert!(refused.contains("--yes"));
        assert_eq!(repo.habits().len(), 1);

        run_command(&repo, Command::Reset { yes: true }).unwrap();
        assert!(repo.habits().is_empty());
    }

    #[test]
    fn reminders_at_a_given_minute() {
        let repo = repo();
        repo.add_habit("Stretch", ReminderTime::from_hm(7, 30), HabitDuration::Unbounded)
            .unwrap();
        let output = run_command(
            &repo,
            Command::Reminders {
                at: ReminderTime::from_hm(7, 30),
            },
        )
        .unwrap();
        assert_eq!(output, "Habit Reminder!: Time to focus on: Stretch\n");
    }

    #[test]
    fn week_grid_marks_today_and_future() {
        let repo = repo();
        let habit = repo.add_habit("Read", None, HabitDuration::Unbounded).unwrap();
        repo.toggle_completion(&habit.id, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        let grid = run_command(&repo, Command::Week { offset: None }).unwrap();
        let lines: Vec<&str> = grid.lines().collect();
        assert!(lines[0].contains("Wed*"));
        assert!(lines[1].starts_with("Read"));
        assert!(lines[1].contains("[x]"));
        assert!(lines[1].ends_with(" -  "));

        let earlier = run_command(&repo, Command::Week { offset: Some(-1) }).unwrap();
        assert!(!earlier.contains("[x]"));
        assert!(!earlier.contains('*'));
    }

    #[test]
    fn reminder_list_without_time() {
        let repo = repo();
        assert_eq!(
            run_command(&repo, Command::Reminders { at: None }).unwrap(),
            "No reminders set.\n"
        );
        repo.add_habit("Stretch", ReminderTime::from_hm(7, 30), HabitDuration::Unbounded)
            .unwrap();
        assert_eq!(
            run_command(&repo, Command::Reminders { at: None }).unwrap(),
            "07:30  Stretch\n"
        );
    }

    #[test]
    fn theme_toggles() {
        let repo = repo();
        let output = run_command(
            &repo,
            Command::Theme {
                choice: Some(ThemeChoice::Toggle),
            },
        )
        .unwrap();
        assert_eq!(output, "Font theme: cartoon\n");
    }
}
