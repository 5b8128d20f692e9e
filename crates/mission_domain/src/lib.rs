pub mod clock;
pub mod completion;
pub mod dates;
pub mod error;
pub mod habit;
pub mod metrics;
pub mod notifications;
pub mod preferences;
pub mod repository;
pub mod store;

pub use crate::error::{HabitError, StoreError};
pub use crate::repository::{HabitRepository, HabitRepositoryBuilder};
