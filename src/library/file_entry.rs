//! A single indexed media file.

use std::path::PathBuf;
use std::time::SystemTime;

use uuid::Uuid;

use crate::decoder::metadata::Metadata;

#[derive(Debug, Clone)]
pub struct LibraryFile {
    pub id: Uuid,
    pub path: PathBuf,
    pub searchable_text: String,
    pub metadata: Option<Metadata>,
    pub play_count: u64,
    pub skip_count: u64,
    pub last_played: Option<SystemTime>,
}

impl LibraryFile {
    pub fn new(path: PathBuf, metadata: Option<Metadata>) -> Self {
        let searchable_text = build_searchable_text(&path, metadata.as_ref());
        LibraryFile {
            id: Uuid::new_v4(),
            path,
            searchable_text,
            metadata,
            play_count: 0,
            skip_count: 0,
            last_played: None,
        }
    }

    /// Records that this entry was just handed off to the playback core.
    pub fn record_play(&mut self) {
        self.play_count += 1;
        self.last_played = Some(SystemTime::now());
    }

    pub fn record_skip(&mut self) {
        self.skip_count += 1;
    }

    pub fn matches(&self, required_substrings: &[String]) -> bool {
        required_substrings
            .iter()
            .all(|needle| self.searchable_text.contains(needle.as_str()))
    }
}

fn build_searchable_text(path: &std::path::Path, metadata: Option<&Metadata>) -> String {
    let mut text = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if let Some(meta) = metadata {
        text.push(' ');
        text.push_str(&meta.title.to_lowercase());
        text.push(' ');
        text.push_str(&meta.artist.to_lowercase());
        text.push(' ');
        text.push_str(&meta.album.to_lowercase());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_every_substring() {
        let file = LibraryFile::new(
            PathBuf::from("/music/song.mp3"),
            Some(Metadata {
                title: "Great Song".into(),
                artist: "The Band".into(),
                album: String::new(),
                duration_secs: None,
            }),
        );
        assert!(file.matches(&["great".to_string(), "band".to_string()]));
        assert!(!file.matches(&["missing".to_string()]));
    }

    #[test]
    fn new_entries_get_a_fresh_uuid() {
        let a = LibraryFile::new(PathBuf::from("/music/a.mp3"), None);
        let b = LibraryFile::new(PathBuf::from("/music/a.mp3"), None);
        assert_ne!(a.id, b.id);
    }
}
