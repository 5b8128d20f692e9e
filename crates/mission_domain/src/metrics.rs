//! Derived progress figures. Everything here is a pure function of the habit collection, the
//! completion log and the dates passed in; nothing is cached and nothing reads the clock.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::completion::CompletionLog;
use crate::dates::{self, MonthRef};
use crate::habit::{Habit, HabitDuration, HabitId};

/// Whole-number percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);

    /// `part / whole` rounded to the nearest integer, halves rounding up. A zero `whole` yields 0.
    pub fn of(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Self::ZERO;
        }
        let (part, whole) = (part as u128, whole as u128);
        let rounded = (part * 200 + whole) / (whole * 2);
        Self(rounded.min(100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{}%", self.0))
    }
}

/// Dates a habit is judged over: the whole reference month for unbounded habits, otherwise
/// `n` consecutive days from the start date, wherever they fall.
pub fn completion_window<'a>(habit: &Habit, month_dates: &'a [NaiveDate]) -> Cow<'a, [NaiveDate]> {
    match habit.duration {
        HabitDuration::Unbounded => Cow::Borrowed(month_dates),
        HabitDuration::FixedDays(days) => Cow::Owned(
            (0..u64::from(days.get()))
                .map_while(|offset| dates::add_days(habit.start_date, offset))
                .collect(),
        ),
    }
}

/// `(completed, window length)` for one habit. Fixed windows are counted straight off the log
/// instead of being enumerated.
fn window_progress(habit: &Habit, log: &CompletionLog, month_dates: &[NaiveDate]) -> (usize, usize) {
    match habit.duration {
        HabitDuration::Unbounded => {
            let completed = month_dates
                .iter()
                .filter(|date| log.is_completed(&habit.id, **date))
                .count();
            (completed, month_dates.len())
        }
        HabitDuration::FixedDays(days) => {
            let days = days.get();
            (
                log.count_within(&habit.id, habit.start_date, u64::from(days)),
                days as usize,
            )
        }
    }
}

fn live_ids(habits: &[Habit]) -> HashSet<&HabitId> {
    habits.iter().map(|habit| &habit.id).collect()
}

fn live_completed_on(log: &CompletionLog, date: NaiveDate, live: &HashSet<&HabitId>) -> usize {
    log.completed_on(date)
        .filter(|id| live.contains(id))
        .count()
}

pub fn habit_completion_rate(
    habit: &Habit,
    log: &CompletionLog,
    month_dates: &[NaiveDate],
) -> Percent {
    let (completed, window_len) = window_progress(habit, log, month_dates);
    Percent::of(completed, window_len)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub completed_count: usize,
    pub cumulative_count: usize,
    pub rate: Percent,
}

pub fn daily_aggregate(
    month_dates: &[NaiveDate],
    habits: &[Habit],
    log: &CompletionLog,
) -> Vec<DailyPoint> {
    let live = live_ids(habits);
    let mut cumulative = 0;
    month_dates
        .iter()
        .map(|&date| {
            let completed_count = live_completed_on(log, date, &live);
            cumulative += completed_count;
            DailyPoint {
                date,
                completed_count,
                cumulative_count: cumulative,
                rate: Percent::of(completed_count, habits.len()),
            }
        })
        .collect()
}

/// Completions in the reference month against `habits × days`, ignoring individual durations.
pub fn monthly_aggregate_rate(
    habits: &[Habit],
    log: &CompletionLog,
    month_dates: &[NaiveDate],
) -> Percent {
    let live = live_ids(habits);
    let completed: usize = month_dates
        .iter()
        .map(|&date| live_completed_on(log, date, &live))
        .sum();
    Percent::of(completed, habits.len() * month_dates.len())
}

/// Completions inside each habit's own window against the sum of all window lengths.
pub fn overall_score(habits: &[Habit], log: &CompletionLog, month_dates: &[NaiveDate]) -> Percent {
    let (completed, possible) = habits.iter().fold((0, 0), |(completed, possible), habit| {
        let (done, window_len) = window_progress(habit, log, month_dates);
        (completed + done, possible + window_len)
    });
    Percent::of(completed, possible)
}

/// Lifetime count of completions that still belong to a live habit.
pub fn total_completions(log: &CompletionLog, habits: &[Habit]) -> usize {
    let live = live_ids(habits);
    log.entries().filter(|(_, id)| live.contains(id)).count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitSummary {
    pub id: HabitId,
    pub name: String,
    pub percentage: Percent,
    pub count: usize,
    pub total_days: usize,
    pub duration_label: String,
}

pub fn habit_summary(habit: &Habit, log: &CompletionLog, month_dates: &[NaiveDate]) -> HabitSummary {
    let (count, total_days) = window_progress(habit, log, month_dates);
    HabitSummary {
        id: habit.id.clone(),
        name: habit.name.clone(),
        percentage: Percent::of(count, total_days),
        count,
        total_days,
        duration_label: habit.duration.label(),
    }
}

pub fn habit_summaries(
    habits: &[Habit],
    log: &CompletionLog,
    month_dates: &[NaiveDate],
) -> Vec<HabitSummary> {
    habits
        .iter()
        .map(|habit| habit_summary(habit, log, month_dates))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreTier {
    JustWarmup,
    SlyHunter,
    ChaseMaster,
}

impl ScoreTier {
    pub fn from_score(score: Percent) -> Self {
        match score.value() {
            75.. => Self::ChaseMaster,
            40.. => Self::SlyHunter,
            _ => Self::JustWarmup,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ChaseMaster => "CHASE MASTER",
            Self::SlyHunter => "Sly Hunter",
            Self::JustWarmup => "Just Warmup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mood {
    Sleepy,
    Happy,
    Celebrating,
}

impl Mood {
    pub fn from_rate(rate: Percent) -> Self {
        match rate.value() {
            0..=19 => Self::Sleepy,
            60.. => Self::Celebrating,
            _ => Self::Happy,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Sleepy => "Tom is resting!",
            Self::Happy => "Jerry's on the hunt!",
            Self::Celebrating => "JERRY FOUND THE STASH!",
        }
    }
}

/// Everything the progress views show for one reference month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub month: MonthRef,
    pub total_goals: usize,
    pub monthly_rate: Percent,
    pub overall_score: Percent,
    pub tier: ScoreTier,
    pub mood: Mood,
    pub total_completions: usize,
    pub daily: Vec<DailyPoint>,
    pub summaries: Vec<HabitSummary>,
}

impl Dashboard {
    pub fn compute(habits: &[Habit], log: &CompletionLog, month: MonthRef) -> Self {
        let dates = month.dates();
        let monthly_rate = monthly_aggregate_rate(habits, log, &dates);
        let overall_score = overall_score(habits, log, &dates);
        Self {
            month,
            total_goals: habits.len(),
            monthly_rate,
            overall_score,
            tier: ScoreTier::from_score(overall_score),
            mood: Mood::from_rate(monthly_rate),
            total_completions: total_completions(log, habits),
            daily: daily_aggregate(&dates, habits, log),
            summaries: habit_summaries(habits, log, &dates),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JourneyStop {
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

const JOURNEY_LABELS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Month-by-month path through `today`'s year.
pub fn journey(today: NaiveDate) -> Vec<JourneyStop> {
    let current = today.month0() as usize;
    JOURNEY_LABELS
        .into_iter()
        .enumerate()
        .map(|(idx, label)| JourneyStop {
            label,
            reached: idx <= current,
            current: idx == current,
        })
        .collect()
}
