//! Drives one clip at a time: reads blocks, runs the normalizer, respects
//! skip, and hands blocks to a bounded output queue.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::RwLock;

use crate::chunk::Block;
use crate::clip::Clip;
use crate::playback::normalizer::Normalizer;
use crate::throttle;

/// Depth of a playback loop's output queue.
const OUTPUT_QUEUE_DEPTH: usize = 2;
const REDUCED_CPU_SLEEP: Duration = Duration::from_millis(20);

pub type ClipProvider = Box<dyn FnMut() -> Option<Box<dyn Clip>> + Send>;
pub type OnClipStart = Box<dyn FnMut(&dyn Clip) + Send>;
pub type OnClipEnd = Box<dyn FnMut(&dyn Clip, bool) + Send>;

#[derive(Debug, Clone, serde::Serialize)]
pub struct CurrentClipInfo {
    pub name: String,
    pub hidden: bool,
}

type DuplicateReply = std::sync::mpsc::Sender<Option<Box<dyn Clip>>>;

/// A handle for controlling a running playback loop from other tasks; the
/// loop's own worker thread is the only place that touches the clip.
pub struct PlaybackLoopHandle {
    skip_tx: SyncSender<()>,
    duplicate_tx: SyncSender<DuplicateReply>,
    current_clip: Arc<RwLock<Option<CurrentClipInfo>>>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackLoopHandle {
    /// Signals a skip. Posting one while one is already pending is a
    /// silent no-op — the skip signal is a latest-write-wins single slot.
    pub fn skip(&self) {
        match self.skip_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {}
        }
    }

    pub fn current_clip(&self) -> Option<CurrentClipInfo> {
        self.current_clip.read().clone()
    }

    /// Asks the worker thread for a [`Clip::duplicate`] of whatever it is
    /// currently playing, backing the "repeat" control operation.
    /// Returns `None` if nothing is playing, or if the worker doesn't
    /// answer within a short bound (it is blocked waiting on the provider
    /// for the next clip, which also means there is nothing to repeat).
    pub fn request_duplicate(&self) -> Option<Box<dyn Clip>> {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        self.duplicate_tx.try_send(reply_tx).ok()?;
        reply_rx.recv_timeout(Duration::from_millis(200)).ok().flatten()
    }

    /// Blocks until the worker thread exits (provider returned `None`).
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the loop's worker thread and returns a control handle plus the
/// receiving end of its output queue.
pub fn spawn(
    mut provider: ClipProvider,
    normalize: bool,
    mut on_clip_start: Option<OnClipStart>,
    mut on_clip_end: Option<OnClipEnd>,
) -> (PlaybackLoopHandle, Receiver<Block>) {
    let (skip_tx, skip_rx) = sync_channel::<()>(1);
    let (duplicate_tx, duplicate_rx) = sync_channel::<DuplicateReply>(1);
    let (output_tx, output_rx) = sync_channel::<Block>(OUTPUT_QUEUE_DEPTH);
    let current_clip = Arc::new(RwLock::new(None));
    let current_clip_for_worker = Arc::clone(&current_clip);

    let worker = std::thread::spawn(move || {
        run(
            &mut provider,
            normalize,
            &skip_rx,
            &duplicate_rx,
            &output_tx,
            &current_clip_for_worker,
            &mut on_clip_start,
            &mut on_clip_end,
        );
    });

    (
        PlaybackLoopHandle {
            skip_tx,
            duplicate_tx,
            current_clip,
            worker: Some(worker),
        },
        output_rx,
    )
}

#[allow(clippy::too_many_arguments)]
fn run(
    provider: &mut ClipProvider,
    normalize: bool,
    skip_rx: &Receiver<()>,
    duplicate_rx: &Receiver<DuplicateReply>,
    output_tx: &SyncSender<Block>,
    current_clip: &Arc<RwLock<Option<CurrentClipInfo>>>,
    on_clip_start: &mut Option<OnClipStart>,
    on_clip_end: &mut Option<OnClipEnd>,
) {
    loop {
        // Nothing is playing yet; answer any pending duplicate request
        // with "nothing to repeat" rather than leaving the caller hanging
        // until its timeout.
        if let Ok(reply_tx) = duplicate_rx.try_recv() {
            let _ = reply_tx.send(None);
        }

        let Some(mut clip) = provider() else {
            break;
        };

        if let Some(cb) = on_clip_start.as_mut() {
            cb(clip.as_ref());
        }
        *current_clip.write() = Some(CurrentClipInfo {
            name: clip.name(),
            hidden: clip.hidden(),
        });

        let mut normalizer = Normalizer::new();
        let reduced_cpu = throttle::should_reduce_cpu();
        let mut skipped = false;

        loop {
            if skip_rx.try_recv().is_ok() {
                clip.stop();
                skipped = true;
            }

            if let Ok(reply_tx) = duplicate_rx.try_recv() {
                let _ = reply_tx.send(Some(clip.duplicate()));
            }

            let (block, has_more) = clip.next_block();
            if let Some(mut block) = block {
                if normalize && !reduced_cpu {
                    normalizer.process(&mut block);
                }
                if output_tx.send(block).is_err() {
                    // Consumer (the mixer) is gone; nothing left to do.
                    return;
                }
            }
            if !has_more {
                break;
            }
        }

        if let Some(cb) = on_clip_end.as_mut() {
            cb(clip.as_ref(), skipped);
        }
        *current_clip.write() = None;

        if reduced_cpu {
            std::thread::sleep(REDUCED_CPU_SLEEP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::PauseClip;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[test]
    fn terminates_when_provider_returns_none() {
        let provider: ClipProvider = Box::new(|| None);
        let (mut handle, rx) = spawn(provider, false, None, None);
        handle.join();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn duplicate_request_with_nothing_playing_returns_none() {
        let provider: ClipProvider = Box::new(|| None);
        let (handle, _rx) = spawn(provider, false, None, None);
        assert!(handle.request_duplicate().is_none());
    }

    #[test]
    fn duplicate_request_returns_a_fresh_clip_of_the_same_kind() {
        let mut served = false;
        let provider: ClipProvider = Box::new(move || {
            if served {
                None
            } else {
                served = true;
                Some(Box::new(PauseClip::indefinite()) as Box<dyn Clip>)
            }
        });
        let (handle, rx) = spawn(provider, false, None, None);
        // give the worker a moment to start the clip before asking for a duplicate
        std::thread::sleep(StdDuration::from_millis(20));
        let duplicate = handle.request_duplicate();
        assert!(duplicate.is_some());
        assert_eq!(duplicate.unwrap().name(), "Pause");
        drop(rx);
    }

    #[test]
    fn drives_a_finite_clip_to_completion() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered_clone = Arc::clone(&delivered);
        let mut served = false;
        let provider: ClipProvider = Box::new(move || {
            if served {
                None
            } else {
                served = true;
                Some(Box::new(PauseClip::new(StdDuration::from_millis(50))) as Box<dyn Clip>)
            }
        });

        let (mut handle, rx) = spawn(provider, false, None, None);
        let drain = std::thread::spawn(move || {
            let mut count = 0;
            while rx.recv().is_ok() {
                count += 1;
            }
            count
        });
        handle.join();
        let count = drain.join().unwrap();
        delivered_clone.store(count, Ordering::SeqCst);
        assert!(delivered.load(Ordering::SeqCst) > 0);
    }
}
