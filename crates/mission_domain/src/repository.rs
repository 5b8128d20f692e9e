use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::{
    clock::{Clock, SystemClock},
    completion::CompletionLog,
    dates::{self, MonthRef, WeekDay},
    error::{HabitError, StoreError},
    habit::{Habit, HabitDuration, HabitId, ReminderTime},
    metrics::Dashboard,
    notifications::{self, ReminderEntry},
    preferences::FontTheme,
    store::{KeyValueStore, MemoryStore, Persisted, StoreKey},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub habits: Vec<Habit>,
    pub completions: CompletionLog,
    pub viewed_month: MonthRef,
    pub font_theme: FontTheme,
}

/// Owns the habit collection, the completion log and the display preference.
///
/// Every mutation runs under the write lock and writes through to the store before the lock is
/// released. A failed write is logged and kept for [`HabitRepository::take_persist_error`]; the
/// in-memory state stays authoritative for the rest of the session.
pub struct HabitRepository {
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    state: RwLock<RepositoryState>,
}

struct RepositoryState {
    habits: Persisted<Vec<Habit>>,
    completions: Persisted<CompletionLog>,
    font_theme: Persisted<FontTheme>,
    viewed_month: MonthRef,
    last_persist_error: Option<StoreError>,
}

pub struct HabitRepositoryBuilder {
    store: Option<Box<dyn KeyValueStore>>,
    clock: Option<Box<dyn Clock>>,
}

impl HabitRepositoryBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Loads every key, seeding missing or corrupt ones with their defaults.
    pub fn build(self) -> HabitRepository {
        let store = self.store.unwrap_or_else(|| Box::new(MemoryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));

        let habits = Persisted::load(store.as_ref(), StoreKey::Habits, Vec::new);
        let completions = Persisted::load(store.as_ref(), StoreKey::Completions, CompletionLog::new);
        let font_theme = Persisted::load(store.as_ref(), StoreKey::FontTheme, FontTheme::default);
        let viewed_month = MonthRef::containing(clock.today());
        info!(
            habits = habits.get().len(),
            completions = completions.get().len(),
            %viewed_month,
            "habit repository loaded"
        );

        HabitRepository {
            store,
            clock,
            state: RwLock::new(RepositoryState {
                habits,
                completions,
                font_theme,
                viewed_month,
                last_persist_error: None,
            }),
        }
    }
}

impl Default for HabitRepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitRepository {
    pub fn builder() -> HabitRepositoryBuilder {
        HabitRepositoryBuilder::new()
    }

    #[instrument(skip(self))]
    pub fn add_habit(
        &self,
        name: &str,
        reminder_time: Option<ReminderTime>,
        duration: HabitDuration,
    ) -> Result<Habit, HabitError> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let id = HabitId::unique_for(now, state.habits.get());
        let habit = Habit::create(id, name, reminder_time, duration, now)?;
        state.habits.update(|habits| habits.push(habit.clone()));
        self.persist(&mut state, StoreKey::Habits);
        info!(habit_id = %habit.id, "habit added");
        Ok(habit)
    }

    /// Removes the habit if present. Its completion entries stay in the log as orphans.
    #[instrument(skip(self))]
    pub fn delete_habit(&self, id: &HabitId) -> bool {
        let mut state = self.state.write();
        let removed = state.habits.update(|habits| {
            let before = habits.len();
            habits.retain(|habit| &habit.id != id);
            habits.len() != before
        });
        if removed {
            self.persist(&mut state, StoreKey::Habits);
            info!(habit_id = %id, "habit deleted");
        } else {
            debug!(habit_id = %id, "delete ignored, no such habit");
        }
        removed
    }

    /// Flips the completion mark and returns whether the pair is now completed. The habit does
    /// not have to exist.
    #[instrument(skip(self))]
    pub fn toggle_completion(&self, habit_id: &HabitId, date: NaiveDate) -> bool {
        let mut state = self.state.write();
        let completed = state.completions.update(|log| log.toggle(habit_id, date));
        self.persist(&mut state, StoreKey::Completions);
        debug!(habit_id = %habit_id, %date, completed, "completion toggled");
        completed
    }

    /// Drops every habit and completion and returns the view to the current month. Confirmation
    /// is the caller's job.
    #[instrument(skip(self))]
    pub fn reset_all(&self) {
        let today = self.clock.today();
        let mut state = self.state.write();
        state.habits.update(Vec::clear);
        state.completions.update(CompletionLog::clear);
        state.viewed_month = MonthRef::containing(today);
        self.persist(&mut state, StoreKey::Habits);
        self.persist(&mut state, StoreKey::Completions);
        info!("board reset");
    }

    pub fn set_font_theme(&self, theme: FontTheme) {
        let mut state = self.state.write();
        state.font_theme.update(|current| *current = theme);
        self.persist(&mut state, StoreKey::FontTheme);
    }

    pub fn toggle_font_theme(&self) -> FontTheme {
        let mut state = self.state.write();
        let theme = state.font_theme.update(|current| {
            *current = current.toggled();
            *current
        });
        self.persist(&mut state, StoreKey::FontTheme);
        theme
    }

    pub fn set_viewed_month(&self, month: MonthRef) {
        self.state.write().viewed_month = month;
    }

    pub fn show_next_month(&self) -> MonthRef {
        let mut state = self.state.write();
        state.viewed_month = state.viewed_month.next();
        state.viewed_month
    }

    pub fn show_previous_month(&self) -> MonthRef {
        let mut state = self.state.write();
        state.viewed_month = state.viewed_month.previous();
        state.viewed_month
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.state.read().habits.get().clone()
    }

    pub fn habit(&self, id: &HabitId) -> Option<Habit> {
        self.state
            .read()
            .habits
            .get()
            .iter()
            .find(|habit| &habit.id == id)
            .cloned()
    }

    pub fn completions(&self) -> CompletionLog {
        self.state.read().completions.get().clone()
    }

    pub fn is_completed(&self, habit_id: &HabitId, date: NaiveDate) -> bool {
        self.state.read().completions.get().is_completed(habit_id, date)
    }

    pub fn font_theme(&self) -> FontTheme {
        *self.state.read().font_theme.get()
    }

    pub fn viewed_month(&self) -> MonthRef {
        self.state.read().viewed_month
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn snapshot(&self) -> RepositorySnapshot {
        let state = self.state.read();
        RepositorySnapshot {
            habits: state.habits.get().clone(),
            completions: state.completions.get().clone(),
            viewed_month: state.viewed_month,
            font_theme: *state.font_theme.get(),
        }
    }

    pub fn reminder_entries(&self) -> Vec<ReminderEntry> {
        notifications::reminder_entries(self.state.read().habits.get())
    }

    pub fn dashboard(&self) -> Dashboard {
        let state = self.state.read();
        Dashboard::compute(state.habits.get(), state.completions.get(), state.viewed_month)
    }

    pub fn dashboard_for(&self, month: MonthRef) -> Dashboard {
        let state = self.state.read();
        Dashboard::compute(state.habits.get(), state.completions.get(), month)
    }

    pub fn week(&self, offset_weeks: i64) -> Option<Vec<WeekDay>> {
        dates::week_dates(self.clock.today(), offset_weeks)
    }

    /// First write-through failure since the last call, if any. Later failures are only logged.
    pub fn take_persist_error(&self) -> Option<StoreError> {
        self.state.write().last_persist_error.take()
    }
}

impl HabitRepository {
    fn persist(&self, state: &mut RepositoryState, key: StoreKey) {
        let store = self.store.as_ref();
        let result = match key {
            StoreKey::Habits => state.habits.save(store),
            StoreKey::Completions => state.completions.save(store),
            StoreKey::FontTheme => state.font_theme.save(store),
        };
        if let Err(err) = result {
            error!(%key, %err, "write-through failed, keeping in-memory state");
            state.last_persist_error.get_or_insert(err);
        }
    }
}
