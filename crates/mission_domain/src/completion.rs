use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates;
use crate::habit::HabitId;

/// Sparse record of which habit ids were marked done on which day.
///
/// Buckets are created on first completion and dropped again once empty, so toggling the same
/// pair twice leaves the log exactly as it was. Ids are never checked against the live habit
/// collection here; callers that aggregate must filter orphans themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompletionLog {
    days: BTreeMap<NaiveDate, BTreeSet<HabitId>>,
}

impl<'de> Deserialize<'de> for CompletionLog {
    /// Older logs keep `"date": []` after an un-toggle; those buckets are dropped.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut days = BTreeMap::<NaiveDate, BTreeSet<HabitId>>::deserialize(deserializer)?;
        days.retain(|_, bucket| !bucket.is_empty());
        Ok(Self { days })
    }
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `habit_id` on `date` and returns whether it is now completed.
    pub fn toggle(&mut self, habit_id: &HabitId, date: NaiveDate) -> bool {
        let bucket = self.days.entry(date).or_default();
        let completed = if bucket.remove(habit_id) {
            false
        } else {
            bucket.insert(habit_id.clone());
            true
        };
        if bucket.is_empty() {
            self.days.remove(&date);
        }
        completed
    }

    pub fn is_completed(&self, habit_id: &HabitId, date: NaiveDate) -> bool {
        self.days
            .get(&date)
            .is_some_and(|bucket| bucket.contains(habit_id))
    }

    /// Days marked for `habit_id` among the `days` consecutive days starting at `first`.
    pub fn count_within(&self, habit_id: &HabitId, first: NaiveDate, days: u64) -> usize {
        if days == 0 {
            return 0;
        }
        let last = dates::add_days(first, days - 1);
        self.days
            .range(first..)
            .take_while(|(date, _)| last.map_or(true, |last| **date <= last))
            .filter(|(_, bucket)| bucket.contains(habit_id))
            .count()
    }

    pub fn completed_on(&self, date: NaiveDate) -> impl Iterator<Item = &HabitId> {
        self.days.get(&date).into_iter().flatten()
    }

    /// Every `(date, habit id)` pair in ascending date order.
    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, &HabitId)> {
        self.days
            .iter()
            .flat_map(|(date, bucket)| bucket.iter().map(move |id| (*date, id)))
    }

    pub fn len(&self) -> usize {
        self.days.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }
}
