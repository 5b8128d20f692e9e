use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::HabitError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Millisecond creation stamp, bumped until it collides with nothing in `existing`.
    pub fn unique_for(created_at: DateTime<FixedOffset>, existing: &[Habit]) -> Self {
        let mut stamp = created_at.timestamp_millis();
        loop {
            let candidate = stamp.to_string();
            if !existing.iter().any(|habit| habit.id.0 == candidate) {
                return Self(candidate);
            }
            stamp += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Longest fixed run a habit can be tracked over, roughly one hundred years.
pub const MAX_DURATION_DAYS: u32 = 36_500;

/// How many days a habit is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HabitDuration {
    /// Every day of whichever month is being viewed.
    #[default]
    Unbounded,
    /// A fixed run of consecutive days starting at the habit's start date.
    FixedDays(NonZeroU32),
}

impl HabitDuration {
    /// A fixed run of `days`, which must lie in `1..=MAX_DURATION_DAYS`.
    pub fn days(days: u32) -> Result<Self, HabitError> {
        NonZeroU32::new(days)
            .filter(|days| days.get() <= MAX_DURATION_DAYS)
            .map(Self::FixedDays)
            .ok_or_else(|| HabitError::InvalidDuration(days.to_string()))
    }

    pub fn label(&self) -> String {
        match self {
            Self::Unbounded => "Full Month".to_string(),
            Self::FixedDays(days) => format!("{days} Days"),
        }
    }
}

impl fmt::Display for HabitDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("all"),
            Self::FixedDays(days) => write!(f, "{days}"),
        }
    }
}

impl FromStr for HabitDuration {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::Unbounded);
        }
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(|days| Self::days(days).ok())
            .ok_or_else(|| HabitError::InvalidDuration(s.to_string()))
    }
}

impl Serialize for HabitDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HabitDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Text(String),
            Days(u64),
        }

        match Stored::deserialize(deserializer)? {
            Stored::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Stored::Days(days) => u32::try_from(days)
                .map_err(|_| HabitError::InvalidDuration(days.to_string()))
                .and_then(Self::days)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Minute-precision time of day a reminder fires at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Truncates to the minute so any instant inside that minute matches.
    pub fn at(time: NaiveTime) -> Self {
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ReminderTime {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| HabitError::InvalidReminderTime(s.to_string()))
    }
}

impl Serialize for ReminderTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReminderTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "HabitRecord")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub reminder_time: Option<ReminderTime>,
    pub duration: HabitDuration,
    pub start_date: NaiveDate,
    pub created_at: DateTime<FixedOffset>,
}

impl Habit {
    /// Validates the user-supplied fields and stamps the habit as starting on `created_at`'s day.
    pub fn create(
        id: HabitId,
        name: &str,
        reminder_time: Option<ReminderTime>,
        duration: HabitDuration,
        created_at: DateTime<FixedOffset>,
    ) -> Result<Self, HabitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HabitError::EmptyName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            reminder_time,
            duration,
            start_date: created_at.date_naive(),
            created_at,
        })
    }

    pub fn reminds_at(&self, time: ReminderTime) -> bool {
        self.reminder_time == Some(time)
    }
}

/// Wire shape accepted on load. Older payloads store an empty reminder string, may omit the
/// duration, and may omit the start date.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HabitRecord {
    id: HabitId,
    name: String,
    #[serde(default, deserialize_with = "lenient_reminder")]
    reminder_time: Option<ReminderTime>,
    #[serde(default)]
    duration: HabitDuration,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    created_at: DateTime<FixedOffset>,
}

impl From<HabitRecord> for Habit {
    fn from(record: HabitRecord) -> Self {
        Self {
            start_date: record
                .start_date
                .unwrap_or_else(|| record.created_at.date_naive()),
            id: record.id,
            name: record.name,
            reminder_time: record.reminder_time,
            duration: record.duration,
            created_at: record.created_at,
        }
    }
}

fn lenient_reminder<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ReminderTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| match value.parse() {
            Ok(time) => Some(time),
            Err(err) => {
                tracing::warn!(%err, "dropping unreadable reminder time");
                None
            }
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 1, 8, 15, 0)
            .unwrap()
    }

    #[test]
    fn loads_legacy_habit_payload() {
        let raw = r#"{
            "id": "1767248100000",
            "name": "Read",
            "reminderTime": "",
            "duration": "7",
            "createdAt": "2026-01-01T06:15:00.000Z"
        }"#;
        let habit: Habit = serde_json::from_str(raw).unwrap();
        assert_eq!(habit.id.as_str(), "1767248100000");
        assert_eq!(habit.reminder_time, None);
        assert_eq!(habit.duration, HabitDuration::days(7).unwrap());
        assert_eq!(habit.start_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn missing_duration_means_whole_month() {
        let raw = r#"{"id":"a","name":"Walk","reminderTime":"07:30","duration":"all",
            "startDate":"2025-12-30","createdAt":"2025-12-30T10:00:00+01:00"}"#;
        let habit: Habit = serde_json::from_str(raw).unwrap();
        assert_eq!(habit.duration, HabitDuration::Unbounded);
        assert_eq!(habit.reminder_time, ReminderTime::from_hm(7, 30));

        let raw = r#"{"id":"b","name":"Walk","createdAt":"2025-12-30T10:00:00+01:00"}"#;
        let habit: Habit = serde_json::from_str(raw).unwrap();
        assert_eq!(habit.duration, HabitDuration::Unbounded);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let habit = Habit::create(
            HabitId::new("42"),
            "  Stretch ",
            ReminderTime::from_hm(21, 5),
            HabitDuration::days(14).unwrap(),
            created(),
        )
        .unwrap();
        let value = serde_json::to_value(&habit).unwrap();
        assert_eq!(value["name"], "Stretch");
        assert_eq!(value["reminderTime"], "21:05");
        assert_eq!(value["duration"], "14");
        assert_eq!(value["startDate"], "2026-01-01");
        assert!(value["createdAt"].as_str().unwrap().starts_with("2026-01-01T08:15:00"));
    }

    #[test]
    fn duration_parsing() {
        assert_eq!("all".parse::<HabitDuration>().unwrap(), HabitDuration::Unbounded);
        assert_eq!(" 21 ".parse::<HabitDuration>().unwrap(), HabitDuration::days(21).unwrap());
        assert!("0".parse::<HabitDuration>().is_err());
        assert!("-3".parse::<HabitDuration>().is_err());
        assert!("week".parse::<HabitDuration>().is_err());
        assert_eq!(HabitDuration::Unbounded.label(), "Full Month");
        assert_eq!(HabitDuration::days(30).unwrap().label(), "30 Days");

        let numeric: HabitDuration = serde_json::from_str("30").unwrap();
        assert_eq!(numeric, HabitDuration::days(30).unwrap());
        assert!(serde_json::from_str::<HabitDuration>("0").is_err());
    }

    #[test]
    fn duration_is_capped() {
        let longest = HabitDuration::days(MAX_DURATION_DAYS).unwrap();
        assert_eq!(longest.to_string(), "36500");
        assert_eq!(
            HabitDuration::days(MAX_DURATION_DAYS + 1),
            Err(HabitError::InvalidDuration("36501".into()))
        );
        assert!("4000000000".parse::<HabitDuration>().is_err());
        assert!("99999999999".parse::<HabitDuration>().is_err());
        assert!(serde_json::from_str::<HabitDuration>("4000000000").is_err());
        assert!(serde_json::from_str::<HabitDuration>("\"36501\"").is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        let result = Habit::create(
            HabitId::new("1"),
            "   ",
            None,
            HabitDuration::Unbounded,
            created(),
        );
        assert_eq!(result, Err(HabitError::EmptyName));
    }

    #[test]
    fn unique_ids_skip_collisions() {
        let first = Habit::create(
            HabitId::unique_for(created(), &[]),
            "One",
            None,
            HabitDuration::Unbounded,
            created(),
        )
        .unwrap();
        let second_id = HabitId::unique_for(created(), std::slice::from_ref(&first));
        assert_ne!(first.id, second_id);
        assert_eq!(
            second_id.as_str().parse::<i64>().unwrap(),
            created().timestamp_millis() + 1
        );
    }

    #[test]
    fn reminder_time_truncates_to_minute() {
        let time = NaiveTime::from_hms_opt(7, 30, 42).unwrap();
        assert_eq!(ReminderTime::at(time), ReminderTime::from_hm(7, 30).unwrap());
        assert!("7:3x".parse::<ReminderTime>().is_err());
        assert_eq!("07:30".parse::<ReminderTime>().unwrap().to_string(), "07:30");
    }
}
