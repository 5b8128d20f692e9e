use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitId, ReminderTime};

pub const REMINDER_TITLE: &str = "Habit Reminder!";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRequest {
    pub habit_id: HabitId,
    pub title: String,
    pub body: String,
    pub due_at: ReminderTime,
}

/// Read-only `(name, time)` pair handed to the reminder timer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReminderEntry {
    pub habit_id: HabitId,
    pub name: String,
    pub reminder_time: ReminderTime,
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, reminder: ReminderRequest);
}

pub fn reminder_entries(habits: &[Habit]) -> Vec<ReminderEntry> {
    habits
        .iter()
        .filter_map(|habit| {
            habit.reminder_time.map(|reminder_time| ReminderEntry {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                reminder_time,
            })
        })
        .collect()
}

/// Reminders whose time falls in the same minute as `now`, in display order.
pub fn due_reminders(habits: &[Habit], now: NaiveTime) -> Vec<ReminderRequest> {
    let minute = ReminderTime::at(now);
    habits
        .iter()
        .filter(|habit| habit.reminds_at(minute))
        .map(|habit| ReminderRequest {
            habit_id: habit.id.clone(),
            title: REMINDER_TITLE.to_string(),
            body: format!("Time to focus on: {}", habit.name),
            due_at: minute,
        })
        .collect()
}

/// Hands every reminder due at `now` to `sink` and returns how many were sent.
pub fn dispatch_due(habits: &[Habit], now: NaiveTime, sink: &dyn NotificationSink) -> usize {
    let due = due_reminders(habits, now);
    let sent = due.len();
    for reminder in due {
        tracing::debug!(habit_id = %reminder.habit_id, due_at = %reminder.due_at, "reminder due");
        sink.notify(reminder);
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDuration;
    use chrono::{FixedOffset, TimeZone};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<ReminderRequest>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, reminder: ReminderRequest) {
            self.sent.lock().push(reminder);
        }
    }

    fn habits() -> Vec<Habit> {
        let created = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 1, 6, 0, 0)
            .unwrap();
        vec![
            Habit::create(
                HabitId::new("1"),
                "Stretch",
                ReminderTime::from_hm(7, 30),
                HabitDuration::Unbounded,
                created,
            )
            .unwrap(),
            Habit::create(HabitId::new("2"), "Journal", None, HabitDuration::Unbounded, created)
                .unwrap(),
            Habit::create(
                HabitId::new("3"),
                "Water",
                ReminderTime::from_hm(12, 0),
                HabitDuration::Unbounded,
                created,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn entries_skip_habits_without_reminders() {
        let entries = reminder_entries(&habits());
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Stretch", "Water"]);
    }

    #[test]
    fn due_within_the_same_minute() {
        let now = NaiveTime::from_hms_opt(7, 30, 45).unwrap();
        let due = due_reminders(&habits(), now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, REMINDER_TITLE);
        assert_eq!(due[0].body, "Time to focus on: Stretch");

        let later = NaiveTime::from_hms_opt(7, 31, 0).unwrap();
        assert!(due_reminders(&habits(), later).is_empty());
    }

    #[test]
    fn dispatch_forwards_to_sink() {
        let sink = RecordingSink::default();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(dispatch_due(&habits(), noon, &sink), 1);
        assert_eq!(sink.sent.lock()[0].habit_id, HabitId::new("3"));
    }
}
