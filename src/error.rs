use std::io;
use std::path::PathBuf;

/// Errors the playback core can surface to a caller.
///
/// `DecoderEndOfStream` is deliberately absent: end-of-stream is modeled as
/// the `hasMore=false` leg of [`crate::clip::Clip::next_block`], not as an
/// `Err` variant, since it is an expected terminator rather than a failure.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to start decoder for {path}: {source}")]
    DecoderStartFailed { path: PathBuf, source: io::Error },

    #[error("metadata unavailable for {path}: {reason}")]
    MetadataUnavailable { path: PathBuf, reason: String },

    #[error("decoder I/O error: {0}")]
    DecoderIo(#[from] io::Error),

    #[error("decoder for {path} was already started")]
    AlreadyStarted { path: PathBuf },

    #[error("library scan of {root} failed: {source}")]
    LibraryScanFailed { root: PathBuf, source: io::Error },

    #[error("filesystem watcher failed: {0}")]
    WatcherFailed(String),

    #[error("network request failed: {0}")]
    NetworkFailed(String),

    #[error("queue is empty")]
    QueueEmpty,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
