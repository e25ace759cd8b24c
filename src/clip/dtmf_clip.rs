//! Dials a randomly-chosen phone number as DTMF touch-tones, then leaves a
//! continuous dial tone running — a novelty clip exercising the same
//! synthesized-audio path as [`super::BeepClip`] with more structure.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::chunk::{Block, FRAMES_PER_BUFFER};
use crate::clip::Clip;
use crate::decoder::SAMPLE_RATE;

const VOLUME: f32 = 0.25;
const DIAL_FREQUENCIES: (f32, f32) = (350.0, 440.0);

/// Duration of a single digit's tone, in blocks (~302 ms): a third of a
/// second's worth of frames, one block short, mirroring the upstream
/// `max(1, (SAMPLE_RATE/3)/FRAMES_PER_BUFFER - 1)` derivation.
const DIGIT_TONE_BLOCKS: u32 = (SAMPLE_RATE / 3) / FRAMES_PER_BUFFER as u32 - 1;
/// Silent gap inserted for a space or hyphen in the dialed string.
const CHAR_SEPARATOR_BLOCKS: u32 = 3;
/// Silent gap between the last digit and the dial tone (~0.5 s).
const POST_DIAL_GAP_BLOCKS: u32 = 22;
/// Length of the trailing continuous dial tone (~1.5 s).
const DIAL_TONE_BLOCKS: u32 = 65;

/// 555 is the North American numbering plan's reserved-for-fiction
/// exchange; these are plausible in-universe "iconic movie" numbers.
const TELEPHONE_NUMBERS: &[&str] = &[
    "555-2368",
    "555-0100",
    "555-0123",
    "555-3226",
    "555-4679",
    "555-1234",
];

fn dtmf_frequencies(c: char) -> Option<(f32, f32)> {
    let row = match c {
        '1' | '2' | '3' => 697.0,
        '4' | '5' | '6' => 770.0,
        '7' | '8' | '9' => 852.0,
        '*' | '0' | '#' => 941.0,
        _ => return None,
    };
    let col = match c {
        '1' | '4' | '7' | '*' => 1209.0,
        '2' | '5' | '8' | '0' => 1336.0,
        '3' | '6' | '9' | '#' => 1477.0,
        _ => return None,
    };
    Some((row, col))
}

enum SegmentKind {
    Silence,
    Tone(f32, f32),
}

struct Segment {
    kind: SegmentKind,
    remaining_blocks: u32,
    samples_emitted: usize,
}

impl Segment {
    fn silence(blocks: u32) -> Self {
        Segment {
            kind: SegmentKind::Silence,
            remaining_blocks: blocks,
            samples_emitted: 0,
        }
    }

    fn tone(freqs: (f32, f32), blocks: u32) -> Self {
        Segment {
            kind: SegmentKind::Tone(freqs.0, freqs.1),
            remaining_blocks: blocks,
            samples_emitted: 0,
        }
    }
}

fn build_segments(number: &str) -> VecDeque<Segment> {
    let mut segments = VecDeque::new();
    for c in number.chars() {
        if c == ' ' || c == '-' {
            segments.push_back(Segment::silence(CHAR_SEPARATOR_BLOCKS));
        } else if let Some(freqs) = dtmf_frequencies(c) {
            segments.push_back(Segment::tone(freqs, DIGIT_TONE_BLOCKS));
        }
        // unknown characters are skipped entirely, no segment emitted
    }
    segments.push_back(Segment::silence(POST_DIAL_GAP_BLOCKS));
    segments.push_back(Segment::tone(DIAL_FREQUENCIES, DIAL_TONE_BLOCKS));
    segments
}

fn render_tone_block(freqs: (f32, f32), sample_offset: usize, fade_out: bool) -> Block {
    let mut block = Block::silent();
    block.length = FRAMES_PER_BUFFER;
    let mut peak = 0.0f32;
    let mut rms_acc = 0.0f32;
    for i in 0..FRAMES_PER_BUFFER {
        let t = (sample_offset + i) as f32 / SAMPLE_RATE as f32;
        let mut sample = VOLUME * ((2.0 * PI * freqs.0 * t).sin() + (2.0 * PI * freqs.1 * t).sin());
        if fade_out {
            let fade = 1.0 - (i as f32 / (FRAMES_PER_BUFFER - 1) as f32);
            sample *= fade;
        }
        block.left[i] = sample;
        block.right[i] = sample;
        peak = peak.max(sample.abs());
        rms_acc += sample * sample * 2.0;
    }
    block.peak = peak;
    block.rms = (rms_acc / (2.0 * FRAMES_PER_BUFFER as f32)).sqrt();
    block
}

pub struct DtmfDialClip {
    number: String,
    segments: VecDeque<Segment>,
}

impl DtmfDialClip {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let number = TELEPHONE_NUMBERS
            .choose(&mut rng)
            .copied()
            .unwrap_or("555-0100")
            .to_string();
        DtmfDialClip::dialing(number)
    }

    fn dialing(number: String) -> Self {
        let segments = build_segments(&number);
        DtmfDialClip { number, segments }
    }
}

impl Default for DtmfDialClip {
    fn default() -> Self {
        DtmfDialClip::new()
    }
}

impl Clip for DtmfDialClip {
    fn next_block(&mut self) -> (Option<Block>, bool) {
        let Some(seg) = self.segments.front_mut() else {
            return (None, false);
        };
        if seg.remaining_blocks == 0 {
            self.segments.pop_front();
            return self.next_block();
        }

        let is_last_block_of_segment = seg.remaining_blocks == 1;
        let block = match seg.kind {
            SegmentKind::Silence => Block::silent(),
            SegmentKind::Tone(f1, f2) => {
                let block = render_tone_block((f1, f2), seg.samples_emitted, is_last_block_of_segment);
                seg.samples_emitted += FRAMES_PER_BUFFER;
                block
            }
        };
        seg.remaining_blocks -= 1;

        let is_last_segment = self.segments.len() == 1;
        if seg.remaining_blocks == 0 && is_last_segment {
            self.segments.pop_front();
            return (Some(block), false);
        }
        (Some(block), true)
    }

    fn stop(&mut self) {
        self.segments.clear();
    }

    fn name(&self) -> String {
        format!("Dialing {}", self.number)
    }

    fn duration(&self) -> Duration {
        Duration::ZERO
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        Box::new(DtmfDialClip::dialing(self.number.clone()))
    }
}
