//! Wraps an external decoder child process and exposes a frame-by-frame
//! float stream, matching its raw s16le stereo PCM output at 44.1 kHz
//! on stdout.

pub mod metadata;

use std::io::{self, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::error::{PlayerError, Result};

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u32 = 2;

/// One decoded stereo sample pair in `[-1.0, 1.0]`.
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

/// Outcome of reading a single frame from the decoder's stdout.
pub enum ReadOutcome {
    Frame(Frame),
    EndOfStream,
}

/// A cloneable handle that can force-kill a decoder's child process from
/// outside the thread blocked reading its stdout. `read_frame` only checks
/// for cancellation between reads, so a caller that wants `Stop` to take
/// effect within bounded time while a read is in flight needs this: killing
/// the process closes its stdout, which unblocks the read as end-of-stream.
#[derive(Clone)]
pub struct DecoderKillSwitch {
    child: Arc<Mutex<Option<Child>>>,
}

impl DecoderKillSwitch {
    pub fn kill(&self) {
        if let Some(child) = self.child.lock().unwrap().as_mut() {
            let _ = child.kill();
        }
    }
}

/// Manages the lifecycle of one decoder child process for one source path.
pub struct DecodingProcess {
    path: PathBuf,
    decoder_bin: String,
    child: Arc<Mutex<Option<Child>>>,
    reader: Option<BufReader<ChildStdout>>,
}

impl DecodingProcess {
    pub fn new(path: impl Into<PathBuf>, decoder_bin: impl Into<String>) -> Self {
        DecodingProcess {
            path: path.into(),
            decoder_bin: decoder_bin.into(),
            child: Arc::new(Mutex::new(None)),
            reader: None,
        }
    }

    /// A cloneable handle that can kill the process once started, usable
    /// from a thread other than the one driving `read_frame`/`close`.
    pub fn kill_switch(&self) -> DecoderKillSwitch {
        DecoderKillSwitch {
            child: Arc::clone(&self.child),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Launches the decoder and captures its stdout. Calling this twice
    /// fails with [`PlayerError::AlreadyStarted`].
    pub fn start(&mut self) -> Result<()> {
        if self.child.lock().unwrap().is_some() {
            return Err(PlayerError::AlreadyStarted {
                path: self.path.clone(),
            });
        }
        let mut child = Command::new(&self.decoder_bin)
            .arg("-i")
            .arg(&self.path)
            .arg("-f")
            .arg("s16le")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ac")
            .arg(CHANNELS.to_string())
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PlayerError::DecoderStartFailed {
                path: self.path.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| PlayerError::DecoderStartFailed {
            path: self.path.clone(),
            source: io::Error::new(ErrorKind::Other, "decoder produced no stdout pipe"),
        })?;

        self.reader = Some(BufReader::new(stdout));
        *self.child.lock().unwrap() = Some(child);
        Ok(())
    }

    /// Reads exactly one stereo frame (4 bytes: two little-endian `i16`s).
    /// A truncated frame, or an empty read, is treated as end-of-stream.
    pub fn read_frame(&mut self) -> Result<ReadOutcome> {
        let reader = match &mut self.reader {
            Some(r) => r,
            None => return Ok(ReadOutcome::EndOfStream),
        };
        let mut buf = [0u8; 4];
        match read_exact_or_eof(reader, &mut buf) {
            Ok(true) => {
                let left = i16::from_le_bytes([buf[0], buf[1]]) as f32 / 32768.0;
                let right = i16::from_le_bytes([buf[2], buf[3]]) as f32 / 32768.0;
                Ok(ReadOutcome::Frame(Frame { left, right }))
            }
            Ok(false) => Ok(ReadOutcome::EndOfStream),
            Err(err) => Err(PlayerError::DecoderIo(err)),
        }
    }

    /// Idempotent shutdown: closes the pipe, kills the process if it hasn't
    /// exited, reaps it, and logs anything other than an expected exit.
    pub fn close(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.lock().unwrap().take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if let Err(err) = child.kill() {
                        tracing::warn!(path = %self.path.display(), %err, "failed to kill decoder process");
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "failed to poll decoder process status");
                }
            }
            match child.wait() {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    tracing::debug!(path = %self.path.display(), ?status, "decoder process exited non-zero");
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "failed to reap decoder process");
                }
            }
        }
    }
}

impl Drop for DecodingProcess {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads exactly `buf.len()` bytes, or returns `Ok(false)` if the stream
/// ends before any bytes are read. A partial read followed by EOF (a
/// truncated frame) is also folded into end-of-stream.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_exact_or_eof_reads_full_frame() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = io::Cursor::new(&data[..]);
        let mut buf = [0u8; 4];
        assert!(read_exact_or_eof(&mut cursor, &mut buf).unwrap());
        assert_eq!(buf, data);
    }

    #[test]
    fn read_exact_or_eof_treats_empty_stream_as_eof() {
        let data: [u8; 0] = [];
        let mut cursor = io::Cursor::new(&data[..]);
        let mut buf = [0u8; 4];
        assert!(!read_exact_or_eof(&mut cursor, &mut buf).unwrap());
    }

    #[test]
    fn read_exact_or_eof_treats_truncated_frame_as_eof() {
        let data = [1u8, 2];
        let mut cursor = io::Cursor::new(&data[..]);
        let mut buf = [0u8; 4];
        assert!(!read_exact_or_eof(&mut cursor, &mut buf).unwrap());
    }

    #[test]
    fn close_on_unstarted_process_is_safe() {
        let mut proc = DecodingProcess::new("/tmp/does-not-matter.mp3", "ffmpeg");
        proc.close();
        proc.close();
    }
}
