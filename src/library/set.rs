//! A named collection of library files with three coupled views:
//! a path map (ground truth), a uuid index, and a lazily-rebuilt
//! random-access array.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rand::Rng;
use uuid::Uuid;

use crate::decoder::metadata::Metadata;
use crate::library::file_entry::LibraryFile;

struct Inner {
    by_path: HashMap<PathBuf, LibraryFile>,
    by_id: HashMap<Uuid, PathBuf>,
    array: Vec<PathBuf>,
    dirty: bool,
}

/// Semantic class a file was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    Songs,
    Clips,
    HostClips,
}

pub struct LibrarySet {
    kind: SetKind,
    inner: RwLock<Inner>,
}

impl LibrarySet {
    pub fn new(kind: SetKind) -> Self {
        LibrarySet {
            kind,
            inner: RwLock::new(Inner {
                by_path: HashMap::new(),
                by_id: HashMap::new(),
                array: Vec::new(),
                dirty: false,
            }),
        }
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    /// Inserts a new entry or replaces an existing one at `path` with a
    /// fresh identity — a write always re-ingests with a new uuid, even
    /// if the path was already indexed.
    pub fn add_or_update(&self, path: PathBuf, metadata: Option<Metadata>) -> Uuid {
        let file = LibraryFile::new(path.clone(), metadata);
        let id = file.id;
        let mut inner = self.inner.write();
        if let Some(old) = inner.by_path.get(&path) {
            inner.by_id.remove(&old.id);
        }
        inner.by_id.insert(id, path.clone());
        inner.by_path.insert(path, file);
        inner.dirty = true;
        id
    }

    pub fn remove(&self, path: &Path) -> bool {
        let mut inner = self.inner.write();
        if let Some(file) = inner.by_path.remove(path) {
            inner.by_id.remove(&file.id);
            inner.dirty = true;
            true
        } else {
            false
        }
    }

    /// Moves an entry to `new_path`, preserving its identity. Used when the
    /// filesystem watcher can pair both halves of a rename; otherwise the
    /// caller falls back to `remove` for the old path.
    pub fn rename(&self, old: &Path, new_path: PathBuf) -> Option<Uuid> {
        let mut inner = self.inner.write();
        let mut file = inner.by_path.remove(old)?;
        inner.by_id.remove(&file.id);
        file.path = new_path.clone();
        let id = file.id;
        inner.by_id.insert(id, new_path.clone());
        inner.by_path.insert(new_path, file);
        inner.dirty = true;
        Some(id)
    }

    pub fn size(&self) -> usize {
        self.inner.read().by_path.len()
    }

    fn ensure_array_fresh(&self) {
        if !self.inner.read().dirty {
            return;
        }
        let mut inner = self.inner.write();
        if inner.dirty {
            inner.array = inner.by_path.keys().cloned().collect();
            inner.dirty = false;
        }
    }

    /// Draws two candidates uniformly and returns the one that has never
    /// played, or (if both have played) the one played longer ago.
    pub fn pick_random(&self) -> Option<LibraryFile> {
        self.ensure_array_fresh();
        let inner = self.inner.read();
        if inner.array.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        let a_path = &inner.array[rng.gen_range(0..inner.array.len())];
        let b_path = &inner.array[rng.gen_range(0..inner.array.len())];
        let a = inner.by_path.get(a_path)?;
        let b = inner.by_path.get(b_path)?;
        let winner = match (a.last_played, b.last_played) {
            (None, _) => a,
            (Some(_), None) => b,
            (Some(ta), Some(tb)) => {
                if ta <= tb {
                    a
                } else {
                    b
                }
            }
        };
        Some(winner.clone())
    }

    /// Records that `id` was just handed to the playback core, bumping its
    /// play count and last-played timestamp.
    pub fn record_play(&self, id: Uuid) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.by_id.get(&id).cloned() {
            if let Some(file) = inner.by_path.get_mut(&path) {
                file.record_play();
            }
        }
    }

    /// Records that `id`'s most recent play was skipped rather than played
    /// to completion.
    pub fn record_skip(&self, id: Uuid) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.by_id.get(&id).cloned() {
            if let Some(file) = inner.by_path.get_mut(&path) {
                file.record_skip();
            }
        }
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<LibraryFile> {
        let inner = self.inner.read();
        let path = inner.by_id.get(&id)?;
        inner.by_path.get(path).cloned()
    }

    pub fn search(&self, required_substrings: &[String]) -> Vec<LibraryFile> {
        if required_substrings.is_empty() {
            return Vec::new();
        }
        self.inner
            .read()
            .by_path
            .values()
            .filter(|f| f.matches(required_substrings))
            .cloned()
            .collect()
    }

    /// Streams every match into `tx`, blocking on a full channel like
    /// [`search`](Self::search)'s caller-paced variant. Used so a [`Library`]
    /// search can run all three sets concurrently: once the caller has
    /// collected `limit` results and drops its receiver, a blocked `send`
    /// here fails immediately and this set's scan stops rather than running
    /// to completion for a result nobody will read.
    ///
    /// [`Library`]: crate::library::Library
    pub fn search_into(&self, required_substrings: &[String], tx: &std::sync::mpsc::SyncSender<LibraryFile>) {
        if required_substrings.is_empty() {
            return;
        }
        let inner = self.inner.read();
        for file in inner.by_path.values() {
            if file.matches(required_substrings) && tx.send(file.clone()).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_add_yields_one_entry_with_a_new_uuid() {
        let set = LibrarySet::new(SetKind::Songs);
        let first = set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        set.remove(Path::new("/music/a.mp3"));
        let second = set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        assert_eq!(set.size(), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn pick_random_on_empty_set_returns_none() {
        let set = LibrarySet::new(SetKind::Songs);
        assert!(set.pick_random().is_none());
    }

    #[test]
    fn pick_random_always_returns_an_indexed_member() {
        let set = LibrarySet::new(SetKind::Songs);
        set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        set.add_or_update(PathBuf::from("/music/b.mp3"), None);
        for _ in 0..50 {
            let picked = set.pick_random().unwrap();
            assert!(picked.path == PathBuf::from("/music/a.mp3") || picked.path == PathBuf::from("/music/b.mp3"));
        }
    }

    #[test]
    fn empty_query_matches_nothing() {
        let set = LibrarySet::new(SetKind::Songs);
        set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        assert!(set.search(&[]).is_empty());
    }

    #[test]
    fn record_skip_bumps_the_entrys_skip_count() {
        let set = LibrarySet::new(SetKind::Songs);
        let id = set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        set.record_skip(id);
        set.record_skip(id);
        assert_eq!(set.get_by_id(id).unwrap().skip_count, 2);
    }

    #[test]
    fn rename_preserves_identity() {
        let set = LibrarySet::new(SetKind::Songs);
        let id = set.add_or_update(PathBuf::from("/music/a.mp3"), None);
        let renamed = set.rename(Path::new("/music/a.mp3"), PathBuf::from("/music/b.mp3"));
        assert_eq!(renamed, Some(id));
        assert_eq!(set.size(), 1);
    }
}
