use thiserror::Error;

/// Rejections raised at the repository boundary. None of these leave state half-applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HabitError {
    #[error("habit name must not be empty")]
    EmptyName,
    #[error("invalid habit duration `{0}`, expected `all` or a positive number of days")]
    InvalidDuration(String),
    #[error("invalid reminder time `{0}`, expected HH:MM")]
    InvalidReminderTime(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("month index {0} is outside 0..=11")]
    MonthOutOfRange(u32),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to access stored value `{key}`")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to encode value for `{key}`")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
