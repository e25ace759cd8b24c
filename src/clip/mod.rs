//! The polymorphic clip contract and its concrete payloads.

pub mod beep_clip;
pub mod dtmf_clip;
pub mod file_clip;
pub mod pause_clip;

use std::time::Duration;

use crate::chunk::Block;
use crate::decoder::metadata::Metadata;

pub use beep_clip::BeepClip;
pub use dtmf_clip::DtmfDialClip;
pub use file_clip::FileClip;
pub use pause_clip::PauseClip;

pub type OnStartHook = Box<dyn FnMut(&Metadata) + Send>;
pub type OnStopHook = Box<dyn FnMut() + Send>;

/// A polymorphic producer of audio blocks.
///
/// `next_block` may block until a block is ready, and returns
/// `(None, false)` or `(Some(_), false)` exactly once at end-of-stream;
/// it must not be called again afterwards.
pub trait Clip: Send {
    fn next_block(&mut self) -> (Option<Block>, bool);

    /// Idempotent request to terminate the stream early. `next_block` must
    /// subsequently report `hasMore=false` within bounded time.
    fn stop(&mut self);

    fn name(&self) -> String;

    /// Advisory total duration; zero for indefinite clips.
    fn duration(&self) -> Duration {
        Duration::ZERO
    }

    /// If true, suppressed from history and now-playing display.
    fn hidden(&self) -> bool {
        false
    }

    /// If true, history should record this clip as user-scheduled rather
    /// than as a scheduler pick.
    fn user_scheduled(&self) -> bool {
        false
    }

    /// The library entry (class + id) this clip was picked from, if any.
    /// `None` for clips with no backing library entry (pause, beep, DTMF,
    /// or an ad-hoc file played without going through the library).
    /// Lets a finished clip's skip be attributed back to the entry it came
    /// from; see [`crate::library::LibraryBacked`].
    fn library_ref(&self) -> Option<(crate::library::SetKind, uuid::Uuid)> {
        None
    }

    fn duplicate(&self) -> Box<dyn Clip>;

    /// Registers a callback fired once, on the first `next_block` call.
    fn set_on_start(&mut self, _hook: OnStartHook) {}

    /// Registers a callback fired once, at end-of-stream or on `stop`.
    fn set_on_stop(&mut self, _hook: OnStopHook) {}
}

/// Strips a known audio extension (case-insensitive) from a file name;
/// an unknown extension is left as-is. Used as the display-name fallback
/// when a file carries no usable metadata tags.
pub fn strip_known_extension(file_name: &str) -> String {
    const KNOWN_EXTENSIONS: &[&str] = &["mp3", "ogg", "flac", "wav", "aac", "m4a", "opus"];
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if KNOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => {
            stem.to_string()
        }
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_extensions_case_insensitively() {
        assert_eq!(strip_known_extension("song.MP3"), "song");
        assert_eq!(strip_known_extension("song.flac"), "song");
        assert_eq!(strip_known_extension("song.opus"), "song");
    }

    #[test]
    fn keeps_unknown_extension_intact() {
        assert_eq!(strip_known_extension("readme.txt"), "readme.txt");
        assert_eq!(strip_known_extension("no-extension"), "no-extension");
    }
}
