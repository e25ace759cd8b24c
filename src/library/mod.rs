//! The live, watched media index.

pub mod file_entry;
pub mod set;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

pub use file_entry::LibraryFile;
pub use set::{LibrarySet, SetKind};

use crate::clip::{Clip, OnStartHook, OnStopHook};
use crate::decoder::metadata;
use crate::error::{PlayerError, Result};

/// Owns the three semantic collections and the background watcher task.
///
/// Kept as an explicit, constructible value (not a process-wide global) so
/// the core stays unit-testable with multiple independent instances.
pub struct Library {
    songs: Arc<LibrarySet>,
    clips: Arc<LibrarySet>,
    host_clips: Arc<LibrarySet>,
    probe_bin: String,
    _watcher: Option<notify::RecommendedWatcher>,
}

impl Library {
    /// Performs the initial scan of `root`; a scan failure is fatal at
    /// startup (`LibraryScanFailed`). The filesystem watcher is then
    /// started best-effort: a watcher failure degrades to a static library
    /// rather than aborting startup.
    pub fn scan_and_watch(root: PathBuf, probe_bin: &str) -> Result<Self> {
        let found = watcher::scan(&root).map_err(|source| PlayerError::LibraryScanFailed {
            root: root.clone(),
            source,
        })?;

        let songs = Arc::new(LibrarySet::new(SetKind::Songs));
        let clips = Arc::new(LibrarySet::new(SetKind::Clips));
        let host_clips = Arc::new(LibrarySet::new(SetKind::HostClips));

        for (path, kind) in found {
            let meta = metadata::probe(&path, probe_bin).ok();
            set_for_kind(&songs, &clips, &host_clips, kind).add_or_update(path, meta);
        }

        let mut library = Library {
            songs,
            clips,
            host_clips,
            probe_bin: probe_bin.to_string(),
            _watcher: None,
        };

        match library.start_watch(root) {
            Ok(watcher) => library._watcher = Some(watcher),
            Err(err) => {
                tracing::warn!(%err, "filesystem watcher failed to start; library will not update live");
            }
        }

        Ok(library)
    }

    fn start_watch(&self, root: PathBuf) -> Result<notify::RecommendedWatcher> {
        let (tx, rx) = std::sync::mpsc::channel();
        let songs = Arc::clone(&self.songs);
        let clips = Arc::clone(&self.clips);
        let host_clips = Arc::clone(&self.host_clips);
        let probe_bin = self.probe_bin.clone();

        std::thread::spawn(move || {
            for change in rx {
                apply_change(&songs, &clips, &host_clips, &probe_bin, change);
            }
        });

        watcher::watch(root, tx).map_err(|err| PlayerError::WatcherFailed(err.to_string()))
    }

    pub fn pick_random_song(&self) -> Option<LibraryFile> {
        self.songs.pick_random()
    }

    pub fn pick_random_clip(&self) -> Option<LibraryFile> {
        self.clips.pick_random()
    }

    pub fn pick_random_host_clip(&self) -> Option<LibraryFile> {
        self.host_clips.pick_random()
    }

    pub fn record_play(&self, kind: SetKind, id: uuid::Uuid) {
        self.set_of(kind).record_play(id);
    }

    pub fn record_skip(&self, kind: SetKind, id: uuid::Uuid) {
        self.set_of(kind).record_skip(id);
    }

    /// Looks a file up by id across all three sets, also reporting which
    /// one it belongs to. Used to resolve ids supplied over the control
    /// surface (e.g. "queue this library file") back into playable clips.
    pub fn find_by_id(&self, id: uuid::Uuid) -> Option<(SetKind, LibraryFile)> {
        for set in [&self.songs, &self.clips, &self.host_clips] {
            if let Some(file) = set.get_by_id(id) {
                return Some((set.kind(), file));
            }
        }
        None
    }

    pub fn set_of(&self, kind: SetKind) -> &Arc<LibrarySet> {
        match kind {
            SetKind::Songs => &self.songs,
            SetKind::Clips => &self.clips,
            SetKind::HostClips => &self.host_clips,
        }
    }

    /// Trims, lowercases and splits `query` on whitespace, then queries all
    /// three sets in parallel, streaming matches into a shared bounded
    /// channel. Collection stops as soon as `limit` results have arrived;
    /// dropping the receiver at that point cancels whichever set searches
    /// are still running rather than waiting for them to finish.
    pub fn search(&self, query: &str, limit: usize) -> Vec<LibraryFile> {
        let trimmed = query.trim().to_lowercase();
        if trimmed.is_empty() || limit == 0 {
            return Vec::new();
        }
        let required: Vec<String> = trimmed.split_whitespace().map(String::from).collect();

        let (tx, rx) = std::sync::mpsc::sync_channel(limit);
        let handles: Vec<_> = [&self.songs, &self.clips, &self.host_clips]
            .into_iter()
            .map(|set| {
                let set = Arc::clone(set);
                let required = required.clone();
                let tx = tx.clone();
                std::thread::spawn(move || set.search_into(&required, &tx))
            })
            .collect();
        drop(tx);

        let mut results = Vec::new();
        while results.len() < limit {
            match rx.recv() {
                Ok(file) => results.push(file),
                Err(_) => break,
            }
        }
        // Dropping `rx` here is what cancels any search still in flight:
        // its next blocked `send` observes a disconnected receiver and
        // returns instead of continuing to scan.
        drop(rx);
        for handle in handles {
            let _ = handle.join();
        }
        results
    }
}

fn set_for_kind<'a>(
    songs: &'a Arc<LibrarySet>,
    clips: &'a Arc<LibrarySet>,
    host_clips: &'a Arc<LibrarySet>,
    kind: SetKind,
) -> &'a Arc<LibrarySet> {
    match kind {
        SetKind::Songs => songs,
        SetKind::Clips => clips,
        SetKind::HostClips => host_clips,
    }
}

fn apply_change(
    songs: &Arc<LibrarySet>,
    clips: &Arc<LibrarySet>,
    host_clips: &Arc<LibrarySet>,
    probe_bin: &str,
    change: watcher::LibraryChange,
) {
    match change {
        watcher::LibraryChange::Created(path, kind) | watcher::LibraryChange::Written(path, kind) => {
            let meta = metadata::probe(&path, probe_bin).ok();
            set_for_kind(songs, clips, host_clips, kind).add_or_update(path, meta);
        }
        watcher::LibraryChange::Removed(path) => {
            for set in [songs, clips, host_clips] {
                set.remove(&path);
            }
        }
        watcher::LibraryChange::Renamed { from, to } => match to {
            Some((new_path, kind)) => {
                let target = set_for_kind(songs, clips, host_clips, kind);
                if target.rename(&from, new_path.clone()).is_none() {
                    let meta = metadata::probe(&new_path, probe_bin).ok();
                    target.add_or_update(new_path, meta);
                }
            }
            None => {
                for set in [songs, clips, host_clips] {
                    set.remove(&from);
                }
            }
        },
    }
}

/// Wraps a clip with the library entry it was picked from, so whichever
/// caller ends its playback can feed the outcome back into that entry's
/// play/skip bookkeeping (see [`Clip::library_ref`]).
///
/// [`Scheduler`](crate::scheduler::Scheduler) picks already bump the play
/// count at pick time (matching the original's "bump then build"
/// ordering); this decorator only exists so a *skip* — knowable only once
/// playback ends — can still be attributed back to the right entry.
pub struct LibraryBacked {
    inner: Box<dyn Clip>,
    kind: SetKind,
    id: Uuid,
}

impl LibraryBacked {
    pub fn wrap(inner: Box<dyn Clip>, kind: SetKind, id: Uuid) -> Box<dyn Clip> {
        Box::new(LibraryBacked { inner, kind, id })
    }
}

impl Clip for LibraryBacked {
    fn next_block(&mut self) -> (Option<crate::chunk::Block>, bool) {
        self.inner.next_block()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    fn duration(&self) -> Duration {
        self.inner.duration()
    }

    fn hidden(&self) -> bool {
        self.inner.hidden()
    }

    fn user_scheduled(&self) -> bool {
        self.inner.user_scheduled()
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        LibraryBacked::wrap(self.inner.duplicate(), self.kind, self.id)
    }

    fn set_on_start(&mut self, hook: OnStartHook) {
        self.inner.set_on_start(hook);
    }

    fn set_on_stop(&mut self, hook: OnStopHook) {
        self.inner.set_on_stop(hook);
    }

    fn library_ref(&self) -> Option<(SetKind, Uuid)> {
        Some((self.kind, self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::PauseClip;

    #[test]
    fn library_backed_clip_reports_its_library_ref_and_delegates() {
        let id = Uuid::new_v4();
        let clip = LibraryBacked::wrap(
            Box::new(PauseClip::new(Duration::from_secs(1))),
            SetKind::Songs,
            id,
        );
        assert_eq!(clip.library_ref(), Some((SetKind::Songs, id)));
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[test]
    fn search_with_empty_query_is_empty() {
        let songs = Arc::new(LibrarySet::new(SetKind::Songs));
        let clips = Arc::new(LibrarySet::new(SetKind::Clips));
        let host_clips = Arc::new(LibrarySet::new(SetKind::HostClips));
        let library = Library {
            songs,
            clips,
            host_clips,
            probe_bin: "ffprobe".to_string(),
            _watcher: None,
        };
        assert!(library.search("   ", 10).is_empty());
    }

    #[test]
    fn search_matches_across_all_three_sets() {
        let songs = Arc::new(LibrarySet::new(SetKind::Songs));
        let clips = Arc::new(LibrarySet::new(SetKind::Clips));
        let host_clips = Arc::new(LibrarySet::new(SetKind::HostClips));
        songs.add_or_update(PathBuf::from("/music/jazz-night.mp3"), None);
        clips.add_or_update(PathBuf::from("/clips/jazz-intro.mp3"), None);
        host_clips.add_or_update(PathBuf::from("/hosts/no-match.mp3"), None);
        let library = Library {
            songs,
            clips,
            host_clips,
            probe_bin: "ffprobe".to_string(),
            _watcher: None,
        };
        let results = library.search("jazz", 10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn search_respects_the_limit() {
        let songs = Arc::new(LibrarySet::new(SetKind::Songs));
        for i in 0..20 {
            songs.add_or_update(PathBuf::from(format!("/music/jazz-{i}.mp3")), None);
        }
        let library = Library {
            songs,
            clips: Arc::new(LibrarySet::new(SetKind::Clips)),
            host_clips: Arc::new(LibrarySet::new(SetKind::HostClips)),
            probe_bin: "ffprobe".to_string(),
            _watcher: None,
        };
        let results = library.search("jazz", 5);
        assert_eq!(results.len(), 5);
    }
}
