//! Flat key-value preferences that survive process death.
//!
//! The foreground TUI and the background `fire` helper both read and write the
//! same file. Every write replaces the whole file through a rename so a reader
//! never sees a torn document, and writers from either process take an
//! exclusive lock on `<name>.lock` around their read-modify-write. Separate
//! keys are still not updated together.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::car::Car;
use crate::error::StoreError;

pub const END_TIME: &str = "end_time";
pub const TIMER_FINISHED: &str = "timer_finished";
pub const SELECTED_CAR: &str = "selected_car";
pub const TOTAL_DURATION: &str = "total_duration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
}

impl PrefValue {
    fn kind(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Int(_) => "integer",
        }
    }
}

/// Injected persistence boundary. Each call is individually atomic.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError>;
    fn put(&self, key: &str, value: PrefValue) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Typed accessors for the keys the timer uses
pub trait TimerPrefs {
    fn end_time(&self) -> Result<Option<i64>, StoreError>;
    fn set_end_time(&self, end_ms: i64) -> Result<(), StoreError>;
    fn total_duration(&self) -> Result<Option<u32>, StoreError>;
    fn set_total_duration(&self, secs: u32) -> Result<(), StoreError>;
    /// Removes `end_time` and `total_duration`
    fn clear_session(&self) -> Result<(), StoreError>;
    fn timer_finished(&self) -> Result<bool, StoreError>;
    fn set_timer_finished(&self, finished: bool) -> Result<(), StoreError>;
    fn selected_car(&self) -> Result<Option<Car>, StoreError>;
    fn set_selected_car(&self, car: Car) -> Result<(), StoreError>;
}

fn get_int<S: PreferenceStore + ?Sized>(store: &S, key: &str) -> Result<Option<i64>, StoreError> {
    match store.get(key)? {
        None => Ok(None),
        Some(PrefValue::Int(v)) => Ok(Some(v)),
        Some(other) => Err(StoreError::InvalidValue {
            key: key.to_string(),
            found: other.kind(),
        }),
    }
}

impl<S: PreferenceStore + ?Sized> TimerPrefs for S {
    fn end_time(&self) -> Result<Option<i64>, StoreError> {
        get_int(self, END_TIME)
    }

    fn set_end_time(&self, end_ms: i64) -> Result<(), StoreError> {
        self.put(END_TIME, PrefValue::Int(end_ms))
    }

    fn total_duration(&self) -> Result<Option<u32>, StoreError> {
        Ok(get_int(self, TOTAL_DURATION)?.and_then(|v| u32::try_from(v).ok()))
    }

    fn set_total_duration(&self, secs: u32) -> Result<(), StoreError> {
        self.put(TOTAL_DURATION, PrefValue::Int(secs as i64))
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        self.remove(END_TIME)?;
        self.remove(TOTAL_DURATION)
    }

    fn timer_finished(&self) -> Result<bool, StoreError> {
        match self.get(TIMER_FINISHED)? {
            None => Ok(false),
            Some(PrefValue::Bool(b)) => Ok(b),
            Some(other) => Err(StoreError::InvalidValue {
                key: TIMER_FINISHED.to_string(),
                found: other.kind(),
            }),
        }
    }

    fn set_timer_finished(&self, finished: bool) -> Result<(), StoreError> {
        self.put(TIMER_FINISHED, PrefValue::Bool(finished))
    }

    fn selected_car(&self) -> Result<Option<Car>, StoreError> {
        Ok(get_int(self, SELECTED_CAR)?.and_then(Car::from_id))
    }

    fn set_selected_car(&self, car: Car) -> Result<(), StoreError> {
        self.put(SELECTED_CAR, PrefValue::Int(car.id()))
    }
}

type PrefMap = BTreeMap<String, PrefValue>;

/// JSON file backed store, one flat object per file
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_map(&self) -> Result<PrefMap, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(PrefMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PrefMap::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn write_map(&self, map: &PrefMap) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(map)?;
        let mut tmp = tempfile::NamedTempFile::new_in(self.parent_dir())
            .map_err(|e| self.io_err(e))?;
        tmp.write_all(&data).map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }

    /// Read, change and write back the whole map while holding the
    /// cross-process lock
    fn modify(&self, f: impl FnOnce(&mut PrefMap)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        fs::create_dir_all(self.parent_dir()).map_err(|e| self.io_err(e))?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("lock"))
            .map_err(|e| self.io_err(e))?;
        lock_file.lock_exclusive().map_err(|e| self.io_err(e))?;

        let result = self.read_modify_write(f);

        if let Err(e) = FileExt::unlock(&lock_file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock preferences");
        }
        result
    }

    fn read_modify_write(&self, f: impl FnOnce(&mut PrefMap)) -> Result<(), StoreError> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StoreError::Json(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "discarding unreadable preferences"
                );
                PrefMap::new()
            }
            Err(e) => return Err(e),
        };
        f(&mut map);
        self.write_map(&map)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.read_map()?.get(key).copied())
    }

    fn put(&self, key: &str, value: PrefValue) -> Result<(), StoreError> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.modify(|map| {
            map.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.modify(|map| map.clear())
    }
}

/// In-memory store for tests and headless runs
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    map: Mutex<PrefMap>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
        let map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        Ok(map.get(key).copied())
    }

    fn put(&self, key: &str, value: PrefValue) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FilePreferenceStore::with_path(dir.path().join("prefs.json"));
        assert_eq!(store.end_time().unwrap(), None);
        assert!(!store.timer_finished().unwrap());
        assert_eq!(store.selected_car().unwrap(), None);
    }

    #[test]
    fn values_survive_a_new_store_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let store = FilePreferenceStore::with_path(&path);
        store.set_end_time(1_700_000_000_000).unwrap();
        store.set_timer_finished(true).unwrap();
        store.set_selected_car(Car::FireEngine).unwrap();

        let reopened = FilePreferenceStore::with_path(&path);
        assert_eq!(reopened.end_time().unwrap(), Some(1_700_000_000_000));
        assert!(reopened.timer_finished().unwrap());
        assert_eq!(reopened.selected_car().unwrap(), Some(Car::FireEngine));
    }

    #[test]
    fn file_is_a_flat_json_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = FilePreferenceStore::with_path(&path);
        store.set_end_time(5).unwrap();
        store.set_timer_finished(false).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["end_time"], 5);
        assert_eq!(raw["timer_finished"], false);
    }

    #[test]
    fn clear_session_keeps_car_and_flag() {
        let store = MemoryPreferenceStore::new();
        store.set_end_time(10).unwrap();
        store.set_total_duration(60).unwrap();
        store.set_selected_car(Car::Bus).unwrap();
        store.set_timer_finished(true).unwrap();

        store.clear_session().unwrap();

        assert_eq!(store.end_time().unwrap(), None);
        assert_eq!(store.total_duration().unwrap(), None);
        assert_eq!(store.selected_car().unwrap(), Some(Car::Bus));
        assert!(store.timer_finished().unwrap());
    }

    #[test]
    fn wrong_type_is_reported() {
        let store = MemoryPreferenceStore::new();
        store.put(END_TIME, PrefValue::Bool(true)).unwrap();
        assert_matches!(
            store.end_time(),
            Err(StoreError::InvalidValue { found: "bool", .. })
        );
    }

    #[test]
    fn corrupt_file_is_replaced_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = FilePreferenceStore::with_path(&path);

        assert_matches!(store.get(END_TIME), Err(StoreError::Json(_)));
        store.set_timer_finished(true).unwrap();
        assert!(store.timer_finished().unwrap());
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempdir().unwrap();
        let store = FilePreferenceStore::with_path(dir.path().join("prefs.json"));
        store.set_end_time(1).unwrap();
        store.set_selected_car(Car::Tank).unwrap();
        store.clear().unwrap();
        assert_eq!(store.end_time().unwrap(), None);
        assert_eq!(store.selected_car().unwrap(), None);
    }

    #[test]
    fn two_stores_on_one_file_keep_each_others_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let rounds = 200;

        let writers: Vec<_> = ["tui", "helper"]
            .into_iter()
            .map(|who| {
                let store = FilePreferenceStore::with_path(&path);
                std::thread::spawn(move || {
                    for i in 0..rounds {
                        store
                            .put(&format!("{who}-{i}"), PrefValue::Int(i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let store = FilePreferenceStore::with_path(&path);
        for who in ["tui", "helper"] {
            for i in 0..rounds {
                assert_eq!(
                    store.get(&format!("{who}-{i}")).unwrap(),
                    Some(PrefValue::Int(i)),
                    "{who}-{i} lost"
                );
            }
        }
        assert!(path.with_extension("lock").exists());
    }
}
