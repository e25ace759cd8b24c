//! The semantic Control API consumed by any front-end (web UI, GPIO,
//! scheduler trigger): a thin layer over [`ControlSurface`] that resolves
//! library ids into clips and records history intent, rather than a second
//! control surface.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::clip::{Clip, FileClip, PauseClip};
use crate::control::ControlSurface;
use crate::error::{PlayerError, Result};
use crate::events::{EventBus, PlayerEvent, Subscription};
use crate::history::{History, HistoryEntry};
use crate::library::Library;

/// How long a user-triggered pause lasts before the program resumes on its
/// own.
const PAUSE_DURATION: Duration = Duration::from_secs(10 * 60);

/// Wraps a clip so [`crate::clip::Clip::user_scheduled`] reports `true`,
/// letting [`History`] distinguish user-driven plays from scheduler picks
/// without every concrete [`Clip`] variant having to track the flag itself.
pub struct UserScheduled(Box<dyn Clip>);

impl UserScheduled {
    pub fn wrap(clip: Box<dyn Clip>) -> Box<dyn Clip> {
        Box::new(UserScheduled(clip))
    }
}

impl Clip for UserScheduled {
    fn next_block(&mut self) -> (Option<crate::chunk::Block>, bool) {
        self.0.next_block()
    }

    fn stop(&mut self) {
        self.0.stop()
    }

    fn name(&self) -> String {
        self.0.name()
    }

    fn duration(&self) -> Duration {
        self.0.duration()
    }

    fn hidden(&self) -> bool {
        self.0.hidden()
    }

    fn user_scheduled(&self) -> bool {
        true
    }

    fn library_ref(&self) -> Option<(crate::library::SetKind, Uuid)> {
        self.0.library_ref()
    }

    fn duplicate(&self) -> Box<dyn Clip> {
        UserScheduled::wrap(self.0.duplicate())
    }

    fn set_on_start(&mut self, hook: crate::clip::OnStartHook) {
        self.0.set_on_start(hook);
    }

    fn set_on_stop(&mut self, hook: crate::clip::OnStopHook) {
        self.0.set_on_stop(hook);
    }
}

/// Current-clip/history/uptime summary for the `now` operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NowPlaying {
    pub current: Option<crate::playback::CurrentClipInfo>,
    pub history: Vec<HistoryEntry>,
    #[serde(skip)]
    pub started_at: SystemTime,
}

/// The player's full semantic Control API, built over the real-time
/// [`ControlSurface`] plus the library and the news scheduler's trigger.
/// Per-subscriber buffer depth for the `events` operation's stream.
const EVENT_SUBSCRIBER_CAPACITY: usize = 32;

pub struct PlayerApi {
    control: Arc<ControlSurface>,
    library: Arc<Library>,
    history: Arc<History>,
    events: Arc<EventBus>,
    news: Option<Arc<crate::scheduler::news::NewsScheduler>>,
    decoder_bin: String,
    probe_bin: String,
    started_at: SystemTime,
}

impl PlayerApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control: Arc<ControlSurface>,
        library: Arc<Library>,
        history: Arc<History>,
        events: Arc<EventBus>,
        news: Option<Arc<crate::scheduler::news::NewsScheduler>>,
        decoder_bin: String,
        probe_bin: String,
    ) -> Self {
        PlayerApi {
            control,
            library,
            history,
            events,
            news,
            decoder_bin,
            probe_bin,
            started_at: SystemTime::now(),
        }
    }

    /// `skip`: advances past the current clip with an audible confirmation.
    pub fn skip(&self) {
        self.control.skip_current(false);
    }

    /// `pause`: appends a silent pause and skips to it immediately, so the
    /// program "holds" rather than stopping outright.
    pub fn pause(&self) {
        self.control
            .queue_clip(Some(Box::new(PauseClip::new(PAUSE_DURATION))));
        self.control.skip_current(true);
    }

    /// `repeat`: duplicates whatever is currently playing and prepends it,
    /// so it plays again right after the current clip ends.
    pub fn repeat(&self) -> Result<()> {
        let duplicate = self
            .control
            .request_duplicate_current()
            .ok_or(PlayerError::QueueEmpty)?;
        self.control
            .queue_clip_next(Some(UserScheduled::wrap(duplicate)));
        Ok(())
    }

    /// `schedule(fileId)`: looks a library file up by id and appends it.
    pub fn schedule(&self, file_id: Uuid) -> Result<()> {
        let (kind, file) = self
            .library
            .find_by_id(file_id)
            .ok_or(PlayerError::FileNotFound(Default::default()))?;
        let clip = FileClip::new(&file.path, &self.decoder_bin, &self.probe_bin)?;
        let clip = crate::library::LibraryBacked::wrap(Box::new(clip), kind, file.id);
        self.control.queue_clip(Some(UserScheduled::wrap(clip)));
        Ok(())
    }

    /// `schedule-news-now`: wakes the news fetch immediately rather than
    /// waiting for the next scheduled window.
    pub fn schedule_news_now(&self) -> Result<()> {
        match &self.news {
            Some(news) => {
                news.schedule_now();
                Ok(())
            }
            None => Err(PlayerError::InvalidArgument(
                "news fetch is not enabled".into(),
            )),
        }
    }

    /// `search(query, limit)`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<crate::library::LibraryFile> {
        self.library.search(query, limit)
    }

    /// `download(fileId)`: resolves a library id to its filesystem path,
    /// for a front-end to stream or serve directly.
    pub fn download(&self, file_id: Uuid) -> Result<std::path::PathBuf> {
        self.library
            .find_by_id(file_id)
            .map(|(_, file)| file.path)
            .ok_or(PlayerError::FileNotFound(Default::default()))
    }

    /// `events`: subscribes to the live event stream, so a front-end can
    /// render now-playing and queue-depth changes without polling `now`.
    pub fn events(&self) -> (tokio::sync::mpsc::Receiver<PlayerEvent>, Subscription) {
        self.events.subscribe(EVENT_SUBSCRIBER_CAPACITY)
    }

    /// `now`: current clip, history, and uptime.
    pub fn now(&self) -> NowPlaying {
        NowPlaying {
            current: self.control.currently_playing(),
            history: self.history.snapshot(),
            started_at: self.started_at,
        }
    }
}
