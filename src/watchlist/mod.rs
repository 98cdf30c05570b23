//! File-backed watchlist store.
//!
//! The store keeps every [`WatchlistItem`] in memory, keyed by
//! `(kind, id)`, behind a single reader-writer lock. Each successful
//! mutation rewrites the whole backing file while the write lock is still
//! held, so the file always mirrors the complete state after the call.
//!
//! A failed rewrite is reported as [`WatchlistError::Persistence`], but the
//! in-memory change is kept. Memory and disk stay out of step until the next
//! successful mutation rewrites the file.

use crate::models::{MediaKind, WatchlistItem};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchlistKey {
    pub kind: MediaKind,
    pub id: i64,
}

impl WatchlistKey {
    pub fn new(kind: MediaKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl From<&WatchlistItem> for WatchlistKey {
    fn from(item: &WatchlistItem) -> Self {
        Self::new(item.kind, item.id)
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("{kind} {id} is already in the watchlist")]
    AlreadyExists { kind: MediaKind, id: i64 },

    #[error("{kind} {id} is not in the watchlist")]
    NotFound { kind: MediaKind, id: i64 },

    #[error("failed to persist watchlist: {0}")]
    Persistence(#[from] PersistError),
}

pub struct WatchlistStore {
    items: RwLock<HashMap<WatchlistKey, WatchlistItem>>,
    path: PathBuf,
}

impl WatchlistStore {
    /// Opens the store backed by `path`. A missing, unreadable or malformed
    /// file yields an empty store; this never fails.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load(&path);
        info!("Watchlist loaded from {:?} with {} items", path, items.len());

        Self {
            items: RwLock::new(items),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self, item), fields(kind = %item.kind, id = item.id))]
    pub fn add(&self, mut item: WatchlistItem) -> Result<(), WatchlistError> {
        let mut items = self.write();
        let key = WatchlistKey::from(&item);

        if items.contains_key(&key) {
            return Err(WatchlistError::AlreadyExists {
                kind: key.kind,
                id: key.id,
            });
        }

        item.added_at = Utc::now();
        item.watched = false;
        item.watched_at = None;
        items.insert(key, item);
        debug!("Added to watchlist");

        self.persist(&items)
    }

    #[instrument(skip(self))]
    pub fn remove(&self, kind: MediaKind, id: i64) -> Result<(), WatchlistError> {
        let mut items = self.write();

        if items.remove(&WatchlistKey::new(kind, id)).is_none() {
            return Err(WatchlistError::NotFound { kind, id });
        }
        debug!("Removed from watchlist");

        self.persist(&items)
    }

    /// Flips the watched flag and returns the updated item. `watched_at` is
    /// set when the item becomes watched and cleared when it becomes unwatched.
    #[instrument(skip(self))]
    pub fn toggle_watched(&self, kind: MediaKind, id: i64) -> Result<WatchlistItem, WatchlistError> {
        let mut items = self.write();

        let item = items
            .get_mut(&WatchlistKey::new(kind, id))
            .ok_or(WatchlistError::NotFound { kind, id })?;

        item.watched = !item.watched;
        item.watched_at = item.watched.then(Utc::now);
        let updated = item.clone();
        debug!(watched = updated.watched, "Toggled watched state");

        self.persist(&items)?;
        Ok(updated)
    }

    pub fn get(&self, kind: MediaKind, id: i64) -> Option<WatchlistItem> {
        self.read().get(&WatchlistKey::new(kind, id)).cloned()
    }

    pub fn contains(&self, kind: MediaKind, id: i64) -> bool {
        self.read().contains_key(&WatchlistKey::new(kind, id))
    }

    /// All items, in no particular order.
    pub fn list_all(&self) -> Vec<WatchlistItem> {
        self.read().values().cloned().collect()
    }

    pub fn list_watched(&self) -> Vec<WatchlistItem> {
        self.filtered(true)
    }

    pub fn list_unwatched(&self) -> Vec<WatchlistItem> {
        self.filtered(false)
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    fn filtered(&self, watched: bool) -> Vec<WatchlistItem> {
        self.read()
            .values()
            .filter(|item| item.watched == watched)
            .cloned()
            .collect()
    }

    // A panic while holding the guard cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<WatchlistKey, WatchlistItem>> {
        self.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<WatchlistKey, WatchlistItem>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, items: &HashMap<WatchlistKey, WatchlistItem>) -> Result<(), WatchlistError> {
        save(&self.path, items).map_err(|e| {
            warn!("Failed to write watchlist to {:?}: {}", self.path, e);
            WatchlistError::Persistence(e)
        })
    }
}

fn load(path: &Path) -> HashMap<WatchlistKey, WatchlistItem> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No watchlist file at {:?}, starting empty", path);
            return HashMap::new();
        }
        Err(e) => {
            warn!("Could not read watchlist file {:?}, starting empty: {}", path, e);
            return HashMap::new();
        }
    };

    match serde_json::from_slice::<Vec<WatchlistItem>>(&data) {
        Ok(items) => items
            .into_iter()
            .map(|item| (WatchlistKey::from(&item), item))
            .collect(),
        Err(e) => {
            warn!("Watchlist file {:?} is malformed, starting empty: {}", path, e);
            HashMap::new()
        }
    }
}

fn save(path: &Path, items: &HashMap<WatchlistKey, WatchlistItem>) -> Result<(), PersistError> {
    let items: Vec<&WatchlistItem> = items.values().collect();
    let data = serde_json::to_vec_pretty(&items)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn item(kind: MediaKind, id: i64, title: &str) -> WatchlistItem {
        WatchlistItem {
            id,
            kind,
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            release_date: "1999-10-15".to_string(),
            vote_average: 8.4,
            watched: false,
            added_at: Utc::now(),
            watched_at: None,
        }
    }

    fn temp_store() -> (TempDir, WatchlistStore) {
        let dir = TempDir::new().unwrap();
        let store = WatchlistStore::open(dir.path().join("watchlist.json"));
        (dir, store)
    }

    fn keys(items: &[WatchlistItem]) -> HashSet<WatchlistKey> {
        items.iter().map(WatchlistKey::from).collect()
    }

    #[test]
    fn fight_club_lifecycle() {
        let (_dir, store) = temp_store();

        store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap();
        assert_eq!(store.count(), 1);

        let err = store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap_err();
        assert!(matches!(err, WatchlistError::AlreadyExists { kind: MediaKind::Movie, id: 550 }));
        assert_eq!(store.count(), 1);

        let toggled = store.toggle_watched(MediaKind::Movie, 550).unwrap();
        assert!(toggled.watched);
        assert!(toggled.watched_at.is_some());

        store.remove(MediaKind::Movie, 550).unwrap();
        assert_eq!(store.count(), 0);

        let err = store.remove(MediaKind::Movie, 550).unwrap_err();
        assert!(matches!(err, WatchlistError::NotFound { kind: MediaKind::Movie, id: 550 }));
    }

    #[test]
    fn same_id_different_kind_are_distinct() {
        let (_dir, store) = temp_store();

        store.add(item(MediaKind::Movie, 1399, "A Movie")).unwrap();
        store.add(item(MediaKind::Tv, 1399, "Game of Thrones")).unwrap();

        assert_eq!(store.count(), 2);
        assert!(store.contains(MediaKind::Movie, 1399));
        assert!(store.contains(MediaKind::Tv, 1399));
        assert_eq!(store.get(MediaKind::Tv, 1399).unwrap().title, "Game of Thrones");
    }

    #[test]
    fn add_resets_client_state() {
        let (_dir, store) = temp_store();
        let mut incoming = item(MediaKind::Movie, 13, "Forrest Gump");
        incoming.watched = true;
        incoming.watched_at = Some(Utc::now());
        incoming.added_at = "2001-01-01T00:00:00Z".parse().unwrap();

        let before = Utc::now();
        store.add(incoming).unwrap();
        let stored = store.get(MediaKind::Movie, 13).unwrap();

        assert!(!stored.watched);
        assert_eq!(stored.watched_at, None);
        assert!(stored.added_at >= before);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let (_dir, store) = temp_store();
        store.add(item(MediaKind::Tv, 1396, "Breaking Bad")).unwrap();
        let added_at = store.get(MediaKind::Tv, 1396).unwrap().added_at;

        let first = store.toggle_watched(MediaKind::Tv, 1396).unwrap();
        assert!(first.watched);
        assert!(first.watched_at.is_some());

        let second = store.toggle_watched(MediaKind::Tv, 1396).unwrap();
        assert!(!second.watched);
        assert_eq!(second.watched_at, None);
        assert_eq!(second.added_at, added_at);
    }

    #[test]
    fn toggle_missing_is_not_found() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.toggle_watched(MediaKind::Movie, 42),
            Err(WatchlistError::NotFound { .. })
        ));
    }

    #[test]
    fn get_and_contains_absent() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get(MediaKind::Movie, 1), None);
        assert!(!store.contains(MediaKind::Movie, 1));
    }

    #[test]
    fn reopen_round_trips_all_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.json");

        let store = WatchlistStore::open(&path);
        store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap();
        store.add(item(MediaKind::Movie, 680, "Pulp Fiction")).unwrap();
        let mut no_poster = item(MediaKind::Tv, 1399, "Game of Thrones");
        no_poster.poster_path = None;
        store.add(no_poster).unwrap();
        store.toggle_watched(MediaKind::Movie, 680).unwrap();

        let mut original = store.list_all();
        drop(store);

        let reopened = WatchlistStore::open(&path);
        let mut loaded = reopened.list_all();

        original.sort_by_key(|i| (i.kind.as_str(), i.id));
        loaded.sort_by_key(|i| (i.kind.as_str(), i.id));
        assert_eq!(original, loaded);
    }

    #[test]
    fn persisted_layout_uses_wire_names() {
        let (dir, store) = temp_store();
        store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap();
        let mut no_poster = item(MediaKind::Tv, 1396, "Breaking Bad");
        no_poster.poster_path = None;
        store.add(no_poster).unwrap();
        store.toggle_watched(MediaKind::Tv, 1396).unwrap();

        let raw = fs::read_to_string(dir.path().join("watchlist.json")).unwrap();
        assert!(raw.contains("\n  {"), "file should be indented");

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);

        let movie = records.iter().find(|r| r["type"] == "movie").unwrap();
        assert_eq!(movie["id"], 550);
        assert_eq!(movie["title"], "Fight Club");
        assert_eq!(movie["poster_path"], "/550.jpg");
        assert_eq!(movie["release_date"], "1999-10-15");
        assert_eq!(movie["vote_average"], 8.4);
        assert_eq!(movie["watched"], false);
        assert!(movie["added_at"].is_string());
        assert!(movie.get("watched_at").is_none());

        let tv = records.iter().find(|r| r["type"] == "tv").unwrap();
        assert!(tv["poster_path"].is_null());
        assert_eq!(tv["watched"], true);
        assert!(tv["watched_at"].is_string());
    }

    #[test]
    fn file_tracks_every_mutation() {
        let (dir, store) = temp_store();
        let path = dir.path().join("watchlist.json");

        store.add(item(MediaKind::Movie, 1, "One")).unwrap();
        store.add(item(MediaKind::Movie, 2, "Two")).unwrap();
        assert_eq!(WatchlistStore::open(&path).count(), 2);

        store.remove(MediaKind::Movie, 1).unwrap();
        let reopened = WatchlistStore::open(&path);
        assert_eq!(reopened.count(), 1);
        assert!(reopened.contains(MediaKind::Movie, 2));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = WatchlistStore::open(dir.path().join("nope").join("watchlist.json"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.json");
        fs::write(&path, "{ this is not json").unwrap();

        let store = WatchlistStore::open(&path);
        assert_eq!(store.count(), 0);

        fs::write(&path, r#"[{"id": "oops"}]"#).unwrap();
        assert_eq!(WatchlistStore::open(&path).count(), 0);
    }

    #[test]
    fn duplicate_records_collapse_to_last() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.json");
        let records = vec![
            item(MediaKind::Movie, 550, "First"),
            item(MediaKind::Movie, 550, "Second"),
            item(MediaKind::Tv, 550, "Show"),
        ];
        fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let store = WatchlistStore::open(&path);
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(MediaKind::Movie, 550).unwrap().title, "Second");
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("watchlist.json");
        let store = WatchlistStore::open(&path);

        store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn persistence_failure_keeps_memory_change() {
        let dir = TempDir::new().unwrap();
        // A directory at the file path makes every write fail.
        let path = dir.path().join("watchlist.json");
        fs::create_dir(&path).unwrap();
        let store = WatchlistStore::open(&path);

        let err = store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap_err();
        assert!(matches!(err, WatchlistError::Persistence(PersistError::Io(_))));
        assert!(store.contains(MediaKind::Movie, 550));
        assert_eq!(store.count(), 1);

        assert!(matches!(
            store.toggle_watched(MediaKind::Movie, 550),
            Err(WatchlistError::Persistence(_))
        ));
        assert!(store.get(MediaKind::Movie, 550).unwrap().watched);
    }

    #[test]
    fn failed_remove_still_drops_the_item() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.json");
        let store = WatchlistStore::open(&path);
        store.add(item(MediaKind::Movie, 550, "Fight Club")).unwrap();
        store.add(item(MediaKind::Tv, 1396, "Breaking Bad")).unwrap();

        // Swap the backing file for a directory so the next rewrite fails.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = store.remove(MediaKind::Movie, 550).unwrap_err();
        assert!(matches!(err, WatchlistError::Persistence(PersistError::Io(_))));
        assert!(!store.contains(MediaKind::Movie, 550));
        assert!(store.contains(MediaKind::Tv, 1396));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn partitions_cover_all_items() {
        let (_dir, store) = temp_store();
        for id in 1..=6 {
            let kind = if id % 2 == 0 { MediaKind::Movie } else { MediaKind::Tv };
            store.add(item(kind, id, "x")).unwrap();
        }
        store.toggle_watched(MediaKind::Tv, 1).unwrap();
        store.toggle_watched(MediaKind::Movie, 4).unwrap();

        let all = keys(&store.list_all());
        let watched = keys(&store.list_watched());
        let unwatched = keys(&store.list_unwatched());

        assert_eq!(watched.len(), 2);
        assert!(watched.is_disjoint(&unwatched));
        assert_eq!(&watched | &unwatched, all);
        assert!(store.list_watched().iter().all(|i| i.watched));
        assert!(store.list_unwatched().iter().all(|i| !i.watched));
    }

    #[test]
    fn concurrent_adds_keep_keys_unique() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..20)
                        .filter(|id| store.add(item(MediaKind::Movie, *id, "x")).is_ok())
                        .count()
                })
            })
            .collect();

        let added: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(added, 20);
        assert_eq!(store.count(), 20);
        assert_eq!(WatchlistStore::open(store.path()).count(), 20);
    }
}
