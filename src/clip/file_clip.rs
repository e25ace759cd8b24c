//! Decodes a file through an external decoder process, exposing it as a
//! stream of analyzed [`Block`]s.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::chunk::{Block, FRAMES_PER_BUFFER};
use crate::clip::{strip_known_extension, Clip, OnStartHook, OnStopHook};
use crate::decoder::metadata::{self, Metadata};
use crate::decoder::{DecoderKillSwitch, DecodingProcess, ReadOutcome};
use crate::error::Result;

/// Depth of the producer -> playback-loop block channel.
const BLOCK_QUEUE_DEPTH: usize = 16;

pub struct FileClip {
    path: PathBuf,
    decoder_bin: String,
    probe_bin: String,
    metadata: Metadata,
    display_name: String,
    duration: Duration,
    receiver: Receiver<Block>,
    stop_flag: Arc<AtomicBool>,
    kill_switch: DecoderKillSwitch,
    producer: Option<JoinHandle<()>>,
    started: bool,
    ended: bool,
    on_start: Option<OnStartHook>,
    on_stop: Option<OnStopHook>,
    on_stop_fired: bool,
}

impl FileClip {
    /// Verifies the file exists, probes its metadata, starts the decoder
    /// and spawns the producer thread. A metadata probe failure closes the
    /// (unstarted) decoder and returns an error without spawning anything.
    pub fn new(path: impl Into<PathBuf>, decoder_bin: &str, probe_bin: &str) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(crate::error::PlayerError::FileNotFound(path));
        }

        let mut decoder = DecodingProcess::new(&path, decoder_bin);
        let probed = match metadata::probe(&path, probe_bin) {
            Ok(m) => m,
            Err(err) => {
                decoder.close();
                return Err(err);
            }
        };

        decoder.start()?;
        let kill_switch = decoder.kill_switch();

        let display_name = display_name_for(&path, &probed);
        let duration = probed
            .duration_secs
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::ZERO);

        let (tx, rx) = sync_channel(BLOCK_QUEUE_DEPTH);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let producer = spawn_producer(decoder, tx, Arc::clone(&stop_flag));

        Ok(FileClip {
            path,
            decoder_bin: decoder_bin.to_string(),
            probe_bin: probe_bin.to_string(),
            metadata: probed,
            display_name,
            duration,
            receiver: rx,
            stop_flag,
            kill_switch,
            producer: Some(producer),
            started: false,
            ended: false,
            on_start: None,
            on_stop: None,
            on_stop_fired: false,
        })
    }

    /// Overrides the tag-derived display name, e.g. with a caller-supplied
    /// title for a file whose tags are missing or wrong.
    pub fn set_manual_metadata(&mut self, title: impl Into<String>, artist: impl Into<String>) {
        self.metadata.title = title.into();
        self.metadata.artist = artist.into();
        self.display_name = display_name_for(&self.path, &self.metadata);
    }

    fn fire_on_stop_once(&mut self) {
        if !self.on_stop_fired {
            self.on_stop_fired = true;
            if let Some(hook) = self.on_stop.as_mut() {
                hook();
            }
        }
    }
}

impl Clip for FileClip {
    fn next_block(&mut self) -> (Option<Block>, bool) {
        if self.ended {
            return (None, false);
        }
        if !self.started {
            self.started = true;
            if let Some(hook) = self.on_start.as_mut() {
                hook(&self.metadata);
            }
        }

        match self.receiver.recv() {
            Ok(block) => (Some(block), true),
            Err(_) => {
                self.ended = true;
                self.fire_on_stop_once();
                (None, false)
            }
        }
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        // The producer only checks `stop_flag` between frames; if it's
        // blocked inside a `read_frame` call on the decoder's stdout,
        // killing the process now is what actually unblocks it in bounded
        // time (the read then observes end-of-stream).
        self.kill_switch.kill();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
        // Drain anything already queued so the channel observably closes.
        while self.receiver.try_recv().is_ok() {}
        self.fire_on_stop_once();
    }

    fn name(&self) -> String {
        self.display_name.clone()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        match FileClip::new(self.path.clone(), &self.decoder_bin, &self.probe_bin) {
            Ok(clip) => Box::new(clip),
            Err(_) => Box::new(crate::clip::PauseClip::indefinite()),
        }
    }

    fn set_on_start(&mut self, hook: OnStartHook) {
        self.on_start = Some(hook);
    }

    fn set_on_stop(&mut self, hook: OnStopHook) {
        self.on_stop = Some(hook);
    }
}

impl Drop for FileClip {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.kill_switch.kill();
    }
}

fn display_name_for(path: &Path, metadata: &Metadata) -> String {
    if !metadata.title.is_empty() {
        if !metadata.artist.is_empty() {
            return format!("{} - {}", metadata.artist, metadata.title);
        }
        return metadata.title.clone();
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    strip_known_extension(&file_name)
}

fn spawn_producer(
    mut decoder: DecodingProcess,
    tx: SyncSender<Block>,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let mut block = Block::silent();
            let mut filled = 0usize;
            let mut rms_acc = 0.0f32;
            let mut peak = 0.0f32;
            let mut hit_eof = false;

            while filled < FRAMES_PER_BUFFER {
                if stop_flag.load(Ordering::SeqCst) {
                    hit_eof = true;
                    break;
                }
                match decoder.read_frame() {
                    Ok(ReadOutcome::Frame(frame)) => {
                        block.left[filled] = frame.left;
                        block.right[filled] = frame.right;
                        peak = peak.max(frame.left.abs()).max(frame.right.abs());
                        rms_acc += frame.left * frame.left + frame.right * frame.right;
                        filled += 1;
                    }
                    Ok(ReadOutcome::EndOfStream) => {
                        hit_eof = true;
                        break;
                    }
                    Err(_) => {
                        hit_eof = true;
                        break;
                    }
                }
            }

            if filled > 0 {
                block.length = filled;
                block.peak = peak;
                block.rms = (rms_acc / (2.0 * FRAMES_PER_BUFFER as f32)).sqrt();
                if tx.send(block).is_err() {
                    break;
                }
            }

            if hit_eof {
                break;
            }
        }
        decoder.close();
        // Dropping `tx` here (end of closure) closes the channel, which is
        // how `next_block` observes end-of-stream.
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_artist_and_title() {
        let meta = Metadata {
            title: "Song".into(),
            artist: "Band".into(),
            album: String::new(),
            duration_secs: None,
        };
        assert_eq!(
            display_name_for(Path::new("/music/a.mp3"), &meta),
            "Band - Song"
        );
    }

    #[test]
    fn display_name_falls_back_to_stripped_filename() {
        let meta = Metadata::default();
        assert_eq!(display_name_for(Path::new("/music/a.mp3"), &meta), "a");
        assert_eq!(
            display_name_for(Path::new("/music/a.weird"), &meta),
            "a.weird"
        );
    }

    #[test]
    fn missing_file_is_rejected_before_spawning_a_decoder() {
        let result = FileClip::new("/no/such/file.mp3", "ffmpeg", "ffprobe");
        assert!(result.is_err());
    }
}
