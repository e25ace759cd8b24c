//! Process-wide control surface: the one entry point every
//! front-end (web UI, GPIO button, scheduler) goes through.

use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::clip::Clip;
use crate::playback::{CurrentClipInfo, PlaybackLoopHandle};

/// Bounded capacity of the priority queue. Over-capacity sends block
/// briefly; priority events are human-scale, so a short stall here is fine.
const PRIORITY_QUEUE_CAPACITY: usize = 2;

pub type BeepProvider = Box<dyn Fn() -> Box<dyn Clip> + Send + Sync>;

/// A FIFO of pending clips, supporting both append and prepend, guarded by
/// an `RwLock`.
///
/// Exposed as a standalone type (rather than private to [`ControlSurface`])
/// so a binary wiring the player can create it before the main playback
/// loop's provider closure — which reads from this same queue — and before
/// `ControlSurface` itself, breaking what would otherwise be a
/// construction cycle (provider needs the queue, `ControlSurface` needs
/// the already-spawned loop, the loop needs the provider).
pub struct UserQueue {
    entries: RwLock<VecDeque<Box<dyn Clip>>>,
}

impl UserQueue {
    pub fn new() -> Self {
        UserQueue {
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn push_back(&self, clip: Box<dyn Clip>) {
        self.entries.write().push_back(clip);
    }

    pub fn push_front(&self, clip: Box<dyn Clip>) {
        self.entries.write().push_front(clip);
    }

    pub fn pop_front(&self) -> Option<Box<dyn Clip>> {
        self.entries.write().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for UserQueue {
    fn default() -> Self {
        UserQueue::new()
    }
}

/// The surface every task (HTTP handler, GPIO handler, scheduler) shares.
/// Construction wires it to the two playback loops it drives.
pub struct ControlSurface {
    user_queue: Arc<UserQueue>,
    priority_tx: SyncSender<Box<dyn Clip>>,
    main_loop: Arc<PlaybackLoopHandle>,
    beep_provider: RwLock<Option<BeepProvider>>,
}

impl ControlSurface {
    /// `user_queue` must be the same instance already wired into the main
    /// loop's [`crate::playback::ClipProvider`] (see module docs on
    /// [`UserQueue`]).
    pub fn new(
        user_queue: Arc<UserQueue>,
        main_loop: Arc<PlaybackLoopHandle>,
    ) -> (Self, std::sync::mpsc::Receiver<Box<dyn Clip>>) {
        let (priority_tx, priority_rx) = sync_channel(PRIORITY_QUEUE_CAPACITY);
        (
            ControlSurface {
                user_queue,
                priority_tx,
                main_loop,
                beep_provider: RwLock::new(None),
            },
            priority_rx,
        )
    }

    /// Polled by the main playback loop's provider ahead of the
    /// scheduler's channel.
    pub fn try_pop_user_queue(&self) -> Option<Box<dyn Clip>> {
        self.user_queue.pop_front()
    }

    /// No-op on a `None` clip, matching the contract's "no-op if `c` is nil."
    pub fn queue_clip(&self, clip: Option<Box<dyn Clip>>) {
        if let Some(clip) = clip {
            self.user_queue.push_back(clip);
        }
    }

    pub fn queue_clip_next(&self, clip: Option<Box<dyn Clip>>) {
        if let Some(clip) = clip {
            self.user_queue.push_front(clip);
        }
    }

    /// Signals the main loop to advance past the current clip. When
    /// `silent` is false and a beep provider is registered, a beep is
    /// posted to the priority queue first so the skip is audible.
    pub fn skip_current(&self, silent: bool) {
        if !silent {
            if let Some(provider) = self.beep_provider.read().as_ref() {
                self.play_priority_clip(provider());
            }
        }
        self.main_loop.skip();
    }

    /// Posts a clip to the priority overlay. A full queue blocks briefly;
    /// a disconnected receiver (the priority loop has shut down) is
    /// silently dropped since there's nothing left to overlay onto.
    pub fn play_priority_clip(&self, clip: Box<dyn Clip>) {
        match self.priority_tx.send(clip) {
            Ok(()) => {}
            Err(_disconnected) => {}
        }
    }

    /// Non-blocking variant used internally where a stalled caller would be
    /// worse than a dropped overlay (not part of the public contract, but
    /// kept available for callers that cannot afford to block).
    pub fn try_play_priority_clip(&self, clip: Box<dyn Clip>) -> bool {
        match self.priority_tx.try_send(clip) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn queue_size(&self) -> usize {
        self.user_queue.len()
    }

    pub fn currently_playing(&self) -> Option<CurrentClipInfo> {
        self.main_loop.current_clip()
    }

    /// Backs the "repeat" operation: asks the main loop for a
    /// duplicate of whatever is currently playing, leaving it to the
    /// caller to decide where to queue it (typically `queue_clip_next`).
    pub fn request_duplicate_current(&self) -> Option<Box<dyn Clip>> {
        self.main_loop.request_duplicate()
    }

    pub fn set_beep_provider(&self, provider: BeepProvider) {
        *self.beep_provider.write() = Some(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::PauseClip;
    use std::time::Duration;

    fn dummy_main_loop() -> Arc<PlaybackLoopHandle> {
        let provider: crate::playback::ClipProvider = Box::new(|| None);
        let (handle, _rx) = crate::playback::spawn_loop(provider, false, None, None);
        Arc::new(handle)
    }

    #[test]
    fn queueing_none_is_a_no_op() {
        let main_loop = dummy_main_loop();
        let (surface, _priority_rx) = ControlSurface::new(Arc::new(UserQueue::new()), main_loop);
        surface.queue_clip(None);
        assert_eq!(surface.queue_size(), 0);
    }

    #[test]
    fn queue_next_prepends_ahead_of_queue() {
        let main_loop = dummy_main_loop();
        let (surface, _priority_rx) = ControlSurface::new(Arc::new(UserQueue::new()), main_loop);
        surface.queue_clip(Some(Box::new(PauseClip::new(Duration::from_secs(1)))));
        surface.queue_clip_next(Some(Box::new(PauseClip::new(Duration::from_secs(2)))));
        assert_eq!(surface.queue_size(), 2);
        let first = surface.user_queue.pop_front().unwrap();
        assert_eq!(first.duration(), Duration::from_secs(2));
    }

    #[test]
    fn priority_clip_is_delivered() {
        let main_loop = dummy_main_loop();
        let (surface, priority_rx) = ControlSurface::new(Arc::new(UserQueue::new()), main_loop);
        surface.play_priority_clip(Box::new(PauseClip::new(Duration::from_secs(1))));
        assert!(priority_rx.try_recv().is_ok());
    }

    #[test]
    fn duplicate_current_delegates_to_main_loop() {
        let main_loop = dummy_main_loop();
        let (surface, _priority_rx) = ControlSurface::new(Arc::new(UserQueue::new()), main_loop);
        assert!(surface.request_duplicate_current().is_none());
    }
}
