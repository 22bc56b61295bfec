use crate::workout::Workout;
use dirs_next as dirs;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Key under which the whole workout collection is stored.
pub const WORKOUTS_KEY: &str = "workoutsData";

/// Minimal string key-value storage, modelled after browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
    fn is_empty(&self) -> bool;
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    const DIR: &'static str = "workout_map";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform data directory.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|p| Self::new(p.join(Self::DIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn is_empty(&self) -> bool {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return true;
        };
        !entries.flatten().any(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
    }
}

/// Volatile store used when no data directory is available.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.slots.remove(key);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        (**self).remove(key)
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

/// Saves and restores the workout collection through a [`KeyValueStore`].
pub struct WorkoutRepository<S = Box<dyn KeyValueStore>> {
    store: S,
}

impl WorkoutRepository {
    /// Repository over a store chosen at runtime.
    pub fn boxed(store: impl KeyValueStore + 'static) -> Self {
        Self::new(Box::new(store))
    }
}

impl<S: KeyValueStore> WorkoutRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Serialize the full ordered collection into the storage slot.
    pub fn save(&mut self, workouts: &[Workout]) -> io::Result<()> {
        let data = serde_json::to_string(workouts)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.store.set(WORKOUTS_KEY, &data)
    }

    /// Load the stored collection.
    ///
    /// Missing, unreadable or corrupt data yields an empty collection; the
    /// problem is logged rather than returned. Single records that fail to
    /// decode are skipped and the rest are kept.
    pub fn load(&self) -> Vec<Workout> {
        let data = match self.store.get(WORKOUTS_KEY) {
            Ok(Some(data)) => data,
            Ok(None) => return Vec::new(),
            Err(err) => {
                log::warn!("Failed to read stored workouts: {err}");
                return Vec::new();
            }
        };
        let items = match serde_json::from_str::<Option<Vec<Value>>>(&data) {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                log::warn!("Ignoring corrupt workout data: {err}");
                return Vec::new();
            }
        };
        items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<Workout>(item) {
                Ok(w) => Some(w),
                Err(err) => {
                    log::warn!("Skipping stored workout #{i}: {err}");
                    None
                }
            })
            .collect()
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.store.remove(WORKOUTS_KEY)
    }

    pub fn has_data(&self) -> bool {
        !self.store.is_empty()
    }
}
