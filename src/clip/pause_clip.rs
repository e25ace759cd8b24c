//! Silence, used for scheduled pauses and as the "hidden no-op" clip for
//! a control action that doesn't warrant a visible program entry.

use std::sync::OnceLock;
use std::time::Duration;

use crate::chunk::{Block, FRAMES_PER_BUFFER};
use crate::clip::Clip;
use crate::decoder::SAMPLE_RATE;

fn block_duration() -> Duration {
    Duration::from_secs_f64(FRAMES_PER_BUFFER as f64 / SAMPLE_RATE as f64)
}

fn shared_silent_block() -> &'static Block {
    static BLOCK: OnceLock<Block> = OnceLock::new();
    BLOCK.get_or_init(Block::silent)
}

pub struct PauseClip {
    /// Zero means indefinite.
    duration: Duration,
    progress: Duration,
    stopped: bool,
    hidden: bool,
}

impl PauseClip {
    pub fn new(duration: Duration) -> Self {
        PauseClip {
            duration,
            progress: Duration::ZERO,
            stopped: false,
            hidden: false,
        }
    }

    pub fn indefinite() -> Self {
        PauseClip::new(Duration::ZERO)
    }
}

impl Clip for PauseClip {
    fn next_block(&mut self) -> (Option<Block>, bool) {
        if self.stopped {
            return (None, false);
        }
        self.progress += block_duration();
        let has_more = !(self.duration > Duration::ZERO && self.progress >= self.duration);
        (Some(shared_silent_block().clone()), has_more)
    }

    fn stop(&mut self) {
        if self.progress < Duration::from_secs(1) {
            self.hidden = true;
        }
        self.stopped = true;
    }

    fn name(&self) -> String {
        "Pause".to_string()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn hidden(&self) -> bool {
        self.hidden
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        Box::new(PauseClip::new(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indefinite_pause_runs_forever_until_stopped() {
        let mut pause = PauseClip::indefinite();
        for _ in 0..1000 {
            let (block, has_more) = pause.next_block();
            assert!(block.is_some());
            assert!(has_more);
        }
        pause.stop();
        let (_, has_more) = pause.next_block();
        assert!(!has_more);
    }

    #[test]
    fn finite_pause_ends_after_duration() {
        let mut pause = PauseClip::new(block_duration() * 3);
        for _ in 0..2 {
            let (_, has_more) = pause.next_block();
            assert!(has_more);
        }
        let (_, has_more) = pause.next_block();
        assert!(!has_more);
    }

    #[test]
    fn sub_second_stop_hides_the_clip() {
        let mut pause = PauseClip::indefinite();
        pause.next_block();
        pause.stop();
        assert!(pause.hidden());
    }

    #[test]
    fn long_running_pause_stopped_after_a_second_is_not_hidden() {
        let mut pause = PauseClip::indefinite();
        let blocks_per_second =
            (SAMPLE_RATE as usize / FRAMES_PER_BUFFER) + 2;
        for _ in 0..blocks_per_second {
            pause.next_block();
        }
        pause.stop();
        assert!(!pause.hidden());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut pause = PauseClip::indefinite();
        pause.stop();
        pause.stop();
        let (_, has_more) = pause.next_block();
        assert!(!has_more);
    }
}
