use std::sync::Arc;

use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavecast::clip::Clip;
use wavecast::commands::PlayerApi;
use wavecast::config::{Cli, Config};
use wavecast::control::{ControlSurface, UserQueue};
use wavecast::events::EventBus;
use wavecast::history::History;
use wavecast::library::Library;
use wavecast::playback::{spawn_loop, PriorityMixer};
use wavecast::scheduler::{news::NewsScheduler, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(Cli::parse());

    config.check_dependencies()?;
    tracing::info!(decoder = %config.decoder_bin, probe = %config.probe_bin, "dependencies resolved");

    let library = Arc::new(
        Library::scan_and_watch(config.music_root.clone(), &config.probe_bin)
            .map_err(|err| anyhow::anyhow!("failed to scan media library: {err}"))?,
    );
    tracing::info!(root = %config.music_root.display(), "library scanned");

    let history = Arc::new(History::new());
    let events = Arc::new(EventBus::new(64));
    let user_queue = Arc::new(UserQueue::new());

    // The main loop's provider draws from the user queue ahead of the
    // scheduler, so the scheduler is spawned first and the provider
    // closure only needs to hold its handle and the already-built queue.
    let scheduler = Scheduler::spawn(
        Arc::clone(&library),
        config.decoder_bin.clone(),
        config.probe_bin.clone(),
    );

    let main_provider: wavecast::playback::ClipProvider = {
        let user_queue = Arc::clone(&user_queue);
        Box::new(move || {
            user_queue
                .pop_front()
                .or_else(|| scheduler.next_clip())
        })
    };

    let on_clip_start = {
        let events = Arc::clone(&events);
        Box::new(move |clip: &dyn Clip| {
            events.publish(wavecast::events::PlayerEvent::ClipStarted {
                name: clip.name(),
                hidden: clip.hidden(),
            });
        }) as wavecast::playback::OnClipStart
    };
    let on_clip_end = {
        let events = Arc::clone(&events);
        let history = Arc::clone(&history);
        let library = Arc::clone(&library);
        Box::new(move |clip: &dyn Clip, skipped: bool| {
            history.record_end(clip.name(), clip.hidden(), skipped, clip.user_scheduled());
            if skipped {
                if let Some((kind, id)) = clip.library_ref() {
                    library.record_skip(kind, id);
                }
            }
            events.publish(wavecast::events::PlayerEvent::ClipEnded {
                name: clip.name(),
                skipped,
                hidden: clip.hidden(),
            });
        }) as wavecast::playback::OnClipEnd
    };

    let (main_loop, main_rx) = spawn_loop(
        main_provider,
        config.normalize,
        Some(on_clip_start),
        Some(on_clip_end),
    );
    let main_loop = Arc::new(main_loop);

    // `ControlSurface` owns the priority channel's send side; its receive
    // side becomes the priority loop's provider directly, so a priority
    // clip posted via `play_priority_clip` is exactly what the priority
    // loop picks up next.
    let (control, priority_queue_rx) =
        ControlSurface::new(Arc::clone(&user_queue), Arc::clone(&main_loop));
    let control = Arc::new(control);
    control.set_beep_provider(Box::new(|| Box::new(wavecast::clip::BeepClip::new())));

    let priority_provider: wavecast::playback::ClipProvider =
        Box::new(move || priority_queue_rx.recv().ok());
    let (_priority_loop, priority_rx) = spawn_loop(priority_provider, false, None, None);

    let news = if config.news_enabled {
        Some(Arc::new(NewsScheduler::spawn(
            Arc::clone(&user_queue),
            config.news_feed_url.clone(),
            config.decoder_bin.clone(),
            config.probe_bin.clone(),
        )))
    } else {
        None
    };

    let _api = PlayerApi::new(
        Arc::clone(&control),
        Arc::clone(&library),
        Arc::clone(&history),
        Arc::clone(&events),
        news,
        config.decoder_bin.clone(),
        config.probe_bin.clone(),
    );

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no default audio output device available"))?;
    let stream_config = cpal::StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(wavecast::decoder::SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut adapter = StreamAdapter::new(PriorityMixer::new(main_rx, priority_rx));
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            adapter.fill(data);
        },
        |err| tracing::error!(%err, "audio output stream error"),
        None,
    )?;
    stream
        .play()
        .map_err(|err| anyhow::anyhow!("failed to open audio output device: {err}"))?;
    tracing::info!("audio output stream started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

/// Adapts cpal's single interleaved buffer to the mixer's render contract,
/// which always fills exactly `FRAMES_PER_BUFFER` frames per call. cpal's
/// actual callback size is host-dependent and rarely lines up with that
/// stride, so a rendered block that only gets partially consumed by one
/// callback is held here and drained into the next one, rather than
/// thrown away.
struct StreamAdapter {
    mixer: PriorityMixer,
    left: [f32; wavecast::chunk::FRAMES_PER_BUFFER],
    right: [f32; wavecast::chunk::FRAMES_PER_BUFFER],
    // Frames [cursor, filled) in `left`/`right` are rendered but not yet
    // written out to a callback buffer.
    cursor: usize,
    filled: usize,
}

impl StreamAdapter {
    fn new(mixer: PriorityMixer) -> Self {
        StreamAdapter {
            mixer,
            left: [0.0; wavecast::chunk::FRAMES_PER_BUFFER],
            right: [0.0; wavecast::chunk::FRAMES_PER_BUFFER],
            cursor: 0,
            filled: 0,
        }
    }

    fn fill(&mut self, data: &mut [f32]) {
        let frame_count = data.len() / 2;
        let mut offset = 0;
        while offset < frame_count {
            if self.cursor >= self.filled {
                self.mixer.render(&mut self.left, &mut self.right);
                self.cursor = 0;
                self.filled = self.left.len();
            }
            let take = (self.filled - self.cursor).min(frame_count - offset);
            for i in 0..take {
                data[(offset + i) * 2] = self.left[self.cursor + i];
                data[(offset + i) * 2 + 1] = self.right[self.cursor + i];
            }
            self.cursor += take;
            offset += take;
        }
    }
}
