use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Raw string key-value storage the repository writes through to.
///
/// Implementations only move strings around; encoding and fallback rules live in [`Persisted`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Keys owned by the repository. Exactly one value per key exists per installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Habits,
    Completions,
    FontTheme,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Habits => "habits",
            Self::Completions => "completions",
            Self::FontTheme => "fontTheme",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.write().insert(key.into(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// A typed value mirrored under one store key.
#[derive(Debug, Clone)]
pub struct Persisted<T> {
    key: StoreKey,
    value: T,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Reads `key`, falling back to `default` when the value is missing or unreadable.
    ///
    /// Missing and corrupt values are replaced in the store by the default. When the store itself
    /// cannot be read the default is used for this session and nothing is written.
    pub fn load(store: &dyn KeyValueStore, key: StoreKey, default: impl FnOnce() -> T) -> Self {
        let stored = match store.get(key.as_str()) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(%key, %err, "store unreadable, using default");
                return Self {
                    key,
                    value: default(),
                };
            }
        };

        let value = match stored.map(|raw| serde_json::from_str::<T>(&raw)) {
            Some(Ok(value)) => return Self { key, value },
            Some(Err(err)) => {
                tracing::warn!(%key, %err, "discarding corrupt stored value");
                default()
            }
            None => {
                tracing::debug!(%key, "seeding store with default");
                default()
            }
        };

        let persisted = Self { key, value };
        if let Err(err) = persisted.save(store) {
            tracing::warn!(%key, %err, "unable to seed default value");
        }
        persisted
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&self.value).map_err(|source| StoreError::Serialize {
            key: self.key.to_string(),
            source,
        })?;
        store.set(self.key.as_str(), &encoded)
    }
}

impl<T> Persisted<T> {
    pub fn key(&self) -> StoreKey {
        self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Mutates the in-memory value only. Callers decide when to [`Persisted::save`].
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value)
    }
}
