//! Adaptive loudness normalization.

use crate::chunk::Block;
use crate::dsp::{clamp, lerp};

/// Loudness threshold below which amplification engages.
pub const TARGET_MIN_RMS: f32 = 0.25;
/// Upper bound on automatic boost.
pub const MAX_AMPLIFICATION: f32 = 1.82;

/// Running estimate of recent loudness plus the gain applied to the
/// previous block, carried across blocks within a single clip.
pub struct Normalizer {
    input_loudness: f32,
    last_gain: f32,
}

impl Normalizer {
    pub fn new() -> Self {
        Normalizer {
            input_loudness: TARGET_MIN_RMS,
            last_gain: 1.0,
        }
    }

    /// Updates the loudness estimate, computes the target gain, and applies
    /// it to `block` (interpolating from the previous block's gain).
    pub fn process(&mut self, block: &mut Block) {
        self.input_loudness = update_loudness(self.input_loudness, block);
        let gain = target_gain(block, self.input_loudness);
        block.apply_gain(self.last_gain, gain);
        self.last_gain = gain;
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new()
    }
}

/// Quiet sections decay slowly; loud sections react quickly.
fn update_loudness(previous: f32, block: &Block) -> f32 {
    const MAX_INFLUENCE_LEVEL: f32 = 0.35;
    let factor = lerp(0.001, 0.2, block.rms.min(MAX_INFLUENCE_LEVEL) / MAX_INFLUENCE_LEVEL);
    lerp(previous, block.rms, factor)
}

fn target_gain(block: &Block, input_loudness: f32) -> f32 {
    if input_loudness >= TARGET_MIN_RMS || input_loudness < 0.001 {
        return 1.0;
    }
    let max_gain = clamp(1.0, MAX_AMPLIFICATION, 2.0);
    let mut gain = clamp(1.0, TARGET_MIN_RMS / input_loudness.max(0.01), max_gain);

    if block.rms > TARGET_MIN_RMS {
        let over = clamp(0.0, (gain * block.rms - TARGET_MIN_RMS) / TARGET_MIN_RMS, 1.0);
        gain = lerp(gain, 1.0, over);
    }

    if block.peak * gain > 1.0 {
        gain = (1.0 / block.peak).min(1.0);
    }

    gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::FRAMES_PER_BUFFER;

    fn block_with(rms: f32, peak: f32) -> Block {
        let mut block = Block::silent();
        block.length = FRAMES_PER_BUFFER;
        block.rms = rms;
        block.peak = peak;
        block
    }

    #[test]
    fn loud_input_gets_unity_gain() {
        let block = block_with(0.3, 0.3);
        assert_eq!(target_gain(&block, 0.3), 1.0);
    }

    #[test]
    fn near_silent_input_gets_unity_gain() {
        let block = block_with(0.0, 0.0);
        assert_eq!(target_gain(&block, 0.0005), 1.0);
    }

    #[test]
    fn quiet_input_gets_amplified_within_bound() {
        let block = block_with(0.05, 0.05);
        let gain = target_gain(&block, 0.05);
        assert!(gain > 1.0);
        assert!(gain <= MAX_AMPLIFICATION + 1e-6);
    }

    #[test]
    fn peak_guard_prevents_clipping() {
        let block = block_with(0.05, 0.9);
        let gain = target_gain(&block, 0.05);
        assert!(block.peak * gain <= 1.0 + 1e-6);
    }

    #[test]
    fn converges_toward_target_over_successive_quiet_blocks() {
        let mut normalizer = Normalizer::new();
        let mut loudness = normalizer.input_loudness;
        for _ in 0..200 {
            let block = block_with(0.05, 0.05);
            loudness = update_loudness(loudness, &block);
        }
        assert!((loudness - 0.05).abs() < 0.01);
    }
}
