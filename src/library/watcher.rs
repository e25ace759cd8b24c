//! Directory scan, classification and live filesystem watch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use walkdir::WalkDir;

use crate::library::set::SetKind;

/// Debounce applied after each watcher event burst.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(10);

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components().any(|c| c.as_os_str() == name)
}

/// Classifies a file by directory convention: `/music/` and `/night/`
/// fold into songs, `/clips/` and `/hosts/` map directly.
pub fn classify(path: &Path) -> Option<SetKind> {
    if has_component(path, "hosts") {
        Some(SetKind::HostClips)
    } else if has_component(path, "clips") {
        Some(SetKind::Clips)
    } else if has_component(path, "music") || has_component(path, "night") {
        Some(SetKind::Songs)
    } else {
        None
    }
}

/// Walks `root`, skipping hidden files and directories, returning every
/// regular file paired with its classification (unclassified files are
/// dropped).
pub fn scan(root: &Path) -> std::io::Result<Vec<(PathBuf, SetKind)>> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !is_hidden(entry.path())
    });
    for entry in walker {
        let entry = entry.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_hidden(entry.path()) {
            continue;
        }
        if let Some(kind) = classify(entry.path()) {
            found.push((entry.path().to_path_buf(), kind));
        }
    }
    Ok(found)
}

/// A filesystem change relevant to the library index, already classified.
pub enum LibraryChange {
    Created(PathBuf, SetKind),
    Written(PathBuf, SetKind),
    Removed(PathBuf),
    Renamed { from: PathBuf, to: Option<(PathBuf, SetKind)> },
}

/// Starts a background watch over `root` (and every subdirectory found
/// during the initial scan); classified change events are sent to `tx`.
/// A watcher failure is reported once through `tx` being dropped — the
/// caller degrades to a static library rather than aborting startup.
pub fn watch(root: PathBuf, tx: std::sync::mpsc::Sender<LibraryChange>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(_) => return,
        };
        dispatch_event(event, &tx);
        std::thread::sleep(WATCH_DEBOUNCE);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

fn dispatch_event(event: Event, tx: &std::sync::mpsc::Sender<LibraryChange>) {
    match event.kind {
        EventKind::Create(_) => {
            for path in event.paths {
                if is_hidden(&path) || !path.is_file() {
                    continue;
                }
                if let Some(kind) = classify(&path) {
                    let _ = tx.send(LibraryChange::Created(path, kind));
                }
            }
        }
        // A rename without a resolvable paired target is treated as a
        // remove; when notify does supply both halves (`RenameBoth`), the
        // second path wins. This arm must precede the generic `Modify(_)`
        // catch-all below, or it is never reached.
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            if let [from, to] = event.paths.as_slice() {
                let to_kind = classify(to).map(|k| (to.clone(), k));
                let _ = tx.send(LibraryChange::Renamed {
                    from: from.clone(),
                    to: to_kind,
                });
            } else if let [path] = event.paths.as_slice() {
                let _ = tx.send(LibraryChange::Removed(path.clone()));
            }
        }
        EventKind::Modify(_) => {
            for path in event.paths {
                if is_hidden(&path) || !path.is_file() {
                    continue;
                }
                if let Some(kind) = classify(&path) {
                    let _ = tx.send(LibraryChange::Written(path, kind));
                }
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                let _ = tx.send(LibraryChange::Removed(path));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_directory_convention() {
        assert_eq!(classify(Path::new("/lib/music/a.mp3")), Some(SetKind::Songs));
        assert_eq!(classify(Path::new("/lib/night/a.mp3")), Some(SetKind::Songs));
        assert_eq!(classify(Path::new("/lib/clips/a.mp3")), Some(SetKind::Clips));
        assert_eq!(classify(Path::new("/lib/hosts/a.mp3")), Some(SetKind::HostClips));
        assert_eq!(classify(Path::new("/lib/misc/a.mp3")), None);
    }

    #[test]
    fn hidden_detection() {
        assert!(is_hidden(Path::new("/lib/.git")));
        assert!(is_hidden(Path::new("/lib/.hidden.mp3")));
        assert!(!is_hidden(Path::new("/lib/music/a.mp3")));
    }

    #[test]
    fn scan_skips_hidden_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        std::fs::create_dir_all(&music).unwrap();
        std::fs::write(music.join("a.mp3"), b"").unwrap();
        std::fs::write(music.join(".b.mp3"), b"").unwrap();
        let hidden_dir = dir.path().join(".git");
        std::fs::create_dir_all(&hidden_dir).unwrap();
        std::fs::write(hidden_dir.join("c.mp3"), b"").unwrap();

        let found = scan(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, SetKind::Songs);
    }
}
