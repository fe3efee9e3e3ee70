// Copyright 2024 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Result;

/// Sentinel watermark returned for a key that has never been set (`DEFAULT_UPDATED_AT`, §6).
pub fn epoch_default() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()
}

/// Persists per-stream watermarks; crash-safe (§4.1).
///
/// `set` is synchronous and blocking by design — the store is the one shared, single-writer
/// resource in the pipeline (§5) and every call is followed immediately by the next stage's
/// query, so there is no benefit to an async file write here.
pub struct WatermarkStore {
    path: PathBuf,
    // Held across the whole process lifetime; the pipeline is single-threaded, but the lock
    // still documents that this is the one piece of mutable shared state.
    cache: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl WatermarkStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = load(&path).unwrap_or_default();
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// Returns the stored value, or the epoch default if the key is absent (§4.1).
    pub fn get(&self, key: &str) -> DateTime<Utc> {
        self.cache
            .read()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or_else(epoch_default)
    }

    /// Persists `value` for `key`. Invariant 4 (§3): keys already on disk are never removed, only
    /// added to or overwritten — we read-modify-write the full map every time.
    pub fn set(&self, key: &str, value: DateTime<Utc>) -> Result<()> {
        let mut guard = self.cache.write().unwrap();
        guard.insert(key.to_string(), value);
        persist(&self.path, &guard)?;
        Ok(())
    }
}

fn load(path: &Path) -> Option<HashMap<String, DateTime<Utc>>> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<HashMap<String, DateTime<Utc>>>(&raw) {
        Ok(map) => Some(map),
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "corrupt watermark file, treating as empty");
            None
        }
    }
}

/// Write-to-temp-then-replace: the write must be durable before `set` returns (§4.1).
fn persist(path: &Path, map: &HashMap<String, DateTime<Utc>>) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let body = serde_json::to_string(map)?;
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn absent_key_yields_epoch_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::open(dir.path().join("state.json")).unwrap();
        assert_eq!(store.get("genre_updated_at"), epoch_default());
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::open(dir.path().join("state.json")).unwrap();
        let t = epoch_default() + Duration::days(1);
        store.set("genre_updated_at", t).unwrap();
        assert_eq!(store.get("genre_updated_at"), t);
    }

    #[test]
    fn survives_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let t = epoch_default() + Duration::days(3);
        {
            let store = WatermarkStore::open(&path).unwrap();
            store.set("filmwork_updated_at", t).unwrap();
        }
        let reopened = WatermarkStore::open(&path).unwrap();
        assert_eq!(reopened.get("filmwork_updated_at"), t);
    }

    #[test]
    fn keys_are_a_superset_of_predecessor() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::open(dir.path().join("state.json")).unwrap();
        store.set("genre_updated_at", epoch_default()).unwrap();
        store
            .set("person_updated_at", epoch_default() + Duration::hours(1))
            .unwrap();
        assert_ne!(store.get("genre_updated_at"), epoch_default() + Duration::hours(2));
        assert_eq!(store.get("genre_updated_at"), epoch_default());
        assert_eq!(
            store.get("person_updated_at"),
            epoch_default() + Duration::hours(1)
        );
    }

    #[test]
    fn corrupt_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let store = WatermarkStore::open(&path).unwrap();
        assert_eq!(store.get("genre_updated_at"), epoch_default());
    }
}
