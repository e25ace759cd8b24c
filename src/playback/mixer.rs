//! Arbitrates the main and priority playback loops into a single render
//! callback.

use std::sync::mpsc::Receiver;

use crate::chunk::Block;

pub struct PriorityMixer {
    main_rx: Receiver<Block>,
    priority_rx: Receiver<Block>,
}

impl PriorityMixer {
    pub fn new(main_rx: Receiver<Block>, priority_rx: Receiver<Block>) -> Self {
        PriorityMixer { main_rx, priority_rx }
    }

    /// Fills `left`/`right` (each `FRAMES_PER_BUFFER` long) for one render
    /// callback invocation. Never blocks: at most two non-blocking channel
    /// receives and a memcpy/memset.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        if let Ok(block) = self.priority_rx.try_recv() {
            copy_block(&block, left, right);
            // Drop exactly one pending main block so leftover main audio
            // doesn't echo once the overlay ends.
            let _ = self.main_rx.try_recv();
            return;
        }

        if let Ok(block) = self.main_rx.try_recv() {
            copy_block(&block, left, right);
            return;
        }

        left.fill(0.0);
        right.fill(0.0);
    }
}

fn copy_block(block: &Block, left: &mut [f32], right: &mut [f32]) {
    let len = block.length.min(left.len()).min(right.len());
    left[..len].copy_from_slice(&block.left[..len]);
    right[..len].copy_from_slice(&block.right[..len]);
    if len < left.len() {
        left[len..].fill(0.0);
        right[len..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::FRAMES_PER_BUFFER;
    use std::sync::mpsc::sync_channel;

    fn tone_block(value: f32) -> Block {
        let mut block = Block::silent();
        block.length = FRAMES_PER_BUFFER;
        block.left = [value; FRAMES_PER_BUFFER];
        block.right = [value; FRAMES_PER_BUFFER];
        block
    }

    #[test]
    fn silence_on_both_queues_empty() {
        let (_mt, main_rx) = sync_channel(2);
        let (_pt, priority_rx) = sync_channel(2);
        let mut mixer = PriorityMixer::new(main_rx, priority_rx);
        let mut left = [1.0; FRAMES_PER_BUFFER];
        let mut right = [1.0; FRAMES_PER_BUFFER];
        mixer.render(&mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.0));
        assert!(right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn main_queue_renders_when_priority_empty() {
        let (main_tx, main_rx) = sync_channel(2);
        let (_pt, priority_rx) = sync_channel(2);
        main_tx.send(tone_block(0.5)).unwrap();
        let mut mixer = PriorityMixer::new(main_rx, priority_rx);
        let mut left = [0.0; FRAMES_PER_BUFFER];
        let mut right = [0.0; FRAMES_PER_BUFFER];
        mixer.render(&mut left, &mut right);
        assert_eq!(left[0], 0.5);
    }

    #[test]
    fn priority_block_preempts_and_drops_one_main_block() {
        let (main_tx, main_rx) = sync_channel(2);
        let (priority_tx, priority_rx) = sync_channel(2);
        main_tx.send(tone_block(0.3)).unwrap();
        main_tx.send(tone_block(0.4)).unwrap();
        priority_tx.send(tone_block(0.9)).unwrap();

        let mut mixer = PriorityMixer::new(main_rx, priority_rx);
        let mut left = [0.0; FRAMES_PER_BUFFER];
        let mut right = [0.0; FRAMES_PER_BUFFER];
        mixer.render(&mut left, &mut right);
        assert_eq!(left[0], 0.9);

        // one main block (0.3) was dropped; the next render sees 0.4
        mixer.render(&mut left, &mut right);
        assert_eq!(left[0], 0.4);
    }
}
