//! A short triangle-wave confirmation tone, used as the audible
//! acknowledgement of a skip request and as a priority-mixer smoke test.

use std::sync::OnceLock;
use std::time::Duration;

use crate::chunk::{Block, FRAMES_PER_BUFFER};
use crate::clip::Clip;
use crate::decoder::SAMPLE_RATE;

const WAVELENGTH_SAMPLES: usize = 64;
const BEEP_VOLUME: f32 = 0.2;
const NUMBER_OF_CHUNKS: u32 = 10;

fn triangle_sample(pos_in_cycle: usize) -> f32 {
    let half = WAVELENGTH_SAMPLES / 2;
    let slope = 2.0 / half as f32;
    let v = if pos_in_cycle < half {
        pos_in_cycle as f32 * slope - 1.0
    } else {
        (WAVELENGTH_SAMPLES - pos_in_cycle) as f32 * slope - 1.0
    };
    v * BEEP_VOLUME
}

fn cached_beep_block() -> &'static Block {
    static BLOCK: OnceLock<Block> = OnceLock::new();
    BLOCK.get_or_init(|| {
        let mut block = Block::silent();
        for i in 0..FRAMES_PER_BUFFER {
            let sample = triangle_sample(i % WAVELENGTH_SAMPLES);
            block.left[i] = sample;
            block.right[i] = sample;
        }
        block.length = FRAMES_PER_BUFFER;
        block.peak = BEEP_VOLUME;
        block.rms = BEEP_VOLUME / std::f32::consts::SQRT_2;
        block
    })
}

pub struct BeepClip {
    remaining: u32,
}

impl BeepClip {
    pub fn new() -> Self {
        BeepClip {
            remaining: NUMBER_OF_CHUNKS,
        }
    }
}

impl Default for BeepClip {
    fn default() -> Self {
        BeepClip::new()
    }
}

impl Clip for BeepClip {
    fn next_block(&mut self) -> (Option<Block>, bool) {
        if self.remaining == 0 {
            return (None, false);
        }
        self.remaining -= 1;
        (Some(cached_beep_block().clone()), self.remaining > 0)
    }

    fn stop(&mut self) {
        self.remaining = 0;
    }

    fn name(&self) -> String {
        "Beep".to_string()
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(
            NUMBER_OF_CHUNKS as f64 * FRAMES_PER_BUFFER as f64 / SAMPLE_RATE as f64,
        )
    }

    fn hidden(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        Box::new(BeepClip::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_exactly_ten_blocks() {
        let mut beep = BeepClip::new();
        let mut count = 0;
        loop {
            let (block, has_more) = beep.next_block();
            if block.is_some() {
                count += 1;
            }
            if !has_more {
                break;
            }
        }
        assert_eq!(count, NUMBER_OF_CHUNKS);
    }

    #[test]
    fn is_hidden() {
        assert!(BeepClip::new().hidden());
    }

    #[test]
    fn triangle_wave_stays_within_volume_bound() {
        let block = cached_beep_block();
        for i in 0..block.length {
            assert!(block.left[i].abs() <= BEEP_VOLUME + 1e-6);
        }
    }
}
