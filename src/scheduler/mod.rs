//! Program director: composes an endless interleaved program from
//! library picks and feeds it to the main playback loop's provider through
//! a small bounded channel.

pub mod news;

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::clip::{Clip, FileClip};
use crate::library::{Library, SetKind};

/// Depth of the scheduler's output channel, matching the upstream
/// `schedulerQueue` channel's depth of 3.
const SCHEDULER_QUEUE_DEPTH: usize = 3;

const MUSIC_BLOCK_TARGET: Duration = Duration::from_secs(10 * 60);
const CLIPS_BLOCK_TARGET: Duration = Duration::from_secs(60);
const CLIPS_BLOCK_MAX_COUNT: u32 = 2;
const HOST_CLIP_PROBABILITY_PERCENT: u32 = 50;

/// Read side of the scheduler's output, safe to poll from the real-time
/// playback thread.
pub struct Scheduler {
    rx: Receiver<Box<dyn Clip>>,
}

impl Scheduler {
    /// Spawns the program director as a blocking task — its body blocks on
    /// metadata probes and decoder subprocess spawns, so it runs on a
    /// `tokio::task::spawn_blocking` thread rather than the async runtime
    /// proper.
    pub fn spawn(library: Arc<Library>, decoder_bin: String, probe_bin: String) -> Self {
        let (tx, rx) = sync_channel(SCHEDULER_QUEUE_DEPTH);
        tokio::task::spawn_blocking(move || run(&library, &decoder_bin, &probe_bin, &tx));
        Scheduler { rx }
    }

    /// Never blocks; returns `None` if nothing is queued right now,
    /// mirroring the upstream `GetNextClip`'s non-blocking select.
    pub fn next_clip(&self) -> Option<Box<dyn Clip>> {
        self.rx.try_recv().ok()
    }
}

enum EnqueueOutcome {
    Sent(Duration),
    PickFailed,
    Disconnected,
}

fn run(library: &Library, decoder_bin: &str, probe_bin: &str, tx: &SyncSender<Box<dyn Clip>>) {
    loop {
        let mut music_time = Duration::ZERO;
        while music_time < MUSIC_BLOCK_TARGET {
            match enqueue_pick(library, SetKind::Songs, decoder_bin, probe_bin, tx) {
                EnqueueOutcome::Sent(duration) => music_time += duration,
                EnqueueOutcome::PickFailed => break,
                EnqueueOutcome::Disconnected => return,
            }
        }

        if rand::thread_rng().gen_range(0..100) < HOST_CLIP_PROBABILITY_PERCENT {
            match enqueue_pick(library, SetKind::HostClips, decoder_bin, probe_bin, tx) {
                EnqueueOutcome::Sent(_) => continue,
                EnqueueOutcome::PickFailed => {}
                EnqueueOutcome::Disconnected => return,
            }
        }

        let mut clips_time = Duration::ZERO;
        let mut clips_count = 0u32;
        while clips_time < CLIPS_BLOCK_TARGET && clips_count < CLIPS_BLOCK_MAX_COUNT {
            match enqueue_pick(library, SetKind::Clips, decoder_bin, probe_bin, tx) {
                EnqueueOutcome::Sent(duration) => {
                    clips_time += duration;
                    clips_count += 1;
                }
                EnqueueOutcome::PickFailed => break,
                EnqueueOutcome::Disconnected => return,
            }
        }
    }
}

/// Picks one file from `kind`, records the play (bumping play count and
/// last-played at pick time, matching the upstream `CreateClip`'s "bump
/// then build" ordering) and sends a fresh [`FileClip`] for it.
fn enqueue_pick(
    library: &Library,
    kind: SetKind,
    decoder_bin: &str,
    probe_bin: &str,
    tx: &SyncSender<Box<dyn Clip>>,
) -> EnqueueOutcome {
    let Some(file) = library.set_of(kind).pick_random() else {
        return EnqueueOutcome::PickFailed;
    };
    library.record_play(kind, file.id);

    let clip = match FileClip::new(&file.path, decoder_bin, probe_bin) {
        Ok(clip) => clip,
        Err(err) => {
            tracing::warn!(path = %file.path.display(), %err, "scheduler dropped a pick it could not open");
            return EnqueueOutcome::PickFailed;
        }
    };
    let duration = clip.duration();
    let clip = crate::library::LibraryBacked::wrap(Box::new(clip), kind, file.id);

    match tx.send(clip) {
        Ok(()) => EnqueueOutcome::Sent(duration),
        Err(_disconnected) => EnqueueOutcome::Disconnected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibrarySet;

    #[test]
    fn pick_on_empty_set_is_a_failed_pick() {
        let library_set = LibrarySet::new(SetKind::Songs);
        assert!(library_set.pick_random().is_none());
    }

    #[test]
    fn scheduler_queue_depth_matches_upstream() {
        assert_eq!(SCHEDULER_QUEUE_DEPTH, 3);
    }
}
