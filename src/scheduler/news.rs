//! Hourly news fetch: downloads an RSS feed, finds the latest
//! `audio/mpeg` enclosure published within the last 24 hours, and queues
//! it onto the user queue as a manually-tagged [`FileClip`].

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use rss::Channel;
use tokio::sync::mpsc;

use crate::clip::FileClip;
use crate::control::UserQueue;

/// An episode older than this is considered stale and is skipped rather
/// than queued.
const FRESHNESS_WINDOW: StdDuration = StdDuration::from_secs(24 * 60 * 60);

pub struct NewsScheduler {
    trigger_tx: mpsc::Sender<()>,
}

impl NewsScheduler {
    /// Spawns the fetch loop as a tokio task. Waking happens either on the
    /// next scheduled window or on an explicit [`NewsScheduler::schedule_now`]
    /// call, whichever comes first.
    pub fn spawn(
        user_queue: Arc<UserQueue>,
        feed_url: String,
        decoder_bin: String,
        probe_bin: String,
    ) -> Self {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            loop {
                let delay = time_until_next_show(Utc::now());
                tokio::select! {
                    _ = trigger_rx.recv() => {
                        tracing::info!("news fetch triggered by user");
                    }
                    _ = tokio::time::sleep(delay) => {
                        tracing::info!("news fetch triggered on schedule");
                    }
                }

                if let Err(err) =
                    fetch_and_queue(&user_queue, &feed_url, &decoder_bin, &probe_bin).await
                {
                    tracing::warn!(%err, "news fetch failed; will retry at the next window");
                }
            }
        });

        NewsScheduler { trigger_tx }
    }

    /// Wakes the scheduler immediately instead of waiting for the next
    /// scheduled window.
    pub fn schedule_now(&self) {
        let _ = self.trigger_tx.try_send(());
    }
}

/// How long until the next top-of-hour broadcast, pushed out an extra 15
/// minutes when fewer than 30 minutes remain (so a fetch right before the
/// hour doesn't race a feed that hasn't published yet).
fn time_until_next_show(now: DateTime<Utc>) -> StdDuration {
    let truncated_naive = now
        .date_naive()
        .and_hms_opt(now.hour(), 0, 0)
        .expect("hour is always in range");
    let truncated = Utc.from_utc_datetime(&truncated_naive);
    let mut next_show = truncated + chrono::Duration::hours(1);
    if next_show - now < chrono::Duration::minutes(30) {
        next_show += chrono::Duration::minutes(15);
    }
    (next_show - now).to_std().unwrap_or(StdDuration::ZERO)
}

struct LatestEpisode {
    url: String,
    pub_date: DateTime<Utc>,
}

async fn fetch_and_queue(
    user_queue: &UserQueue,
    feed_url: &str,
    decoder_bin: &str,
    probe_bin: &str,
) -> crate::error::Result<()> {
    let bytes = reqwest::get(feed_url)
        .await
        .map_err(|err| crate::error::PlayerError::NetworkFailed(err.to_string()))?
        .bytes()
        .await
        .map_err(|err| crate::error::PlayerError::NetworkFailed(err.to_string()))?;

    let channel = Channel::read_from(&bytes[..])
        .map_err(|err| crate::error::PlayerError::NetworkFailed(err.to_string()))?;

    let Some(episode) = latest_audio_episode(&channel) else {
        return Err(crate::error::PlayerError::NetworkFailed(
            "no valid audio entries found in feed".into(),
        ));
    };

    if Utc::now() - episode.pub_date > chrono::Duration::from_std(FRESHNESS_WINDOW).unwrap() {
        tracing::info!(pub_date = %episode.pub_date, "no recent episode available, skipping this window");
        return Ok(());
    }

    let body = reqwest::get(&episode.url)
        .await
        .map_err(|err| crate::error::PlayerError::NetworkFailed(err.to_string()))?
        .bytes()
        .await
        .map_err(|err| crate::error::PlayerError::NetworkFailed(err.to_string()))?;

    let temp_file = tempfile::Builder::new()
        .prefix("wavecast-news-")
        .suffix(".mp3")
        .tempfile()
        .map_err(crate::error::PlayerError::DecoderIo)?;
    std::fs::write(temp_file.path(), &body).map_err(crate::error::PlayerError::DecoderIo)?;
    // Keep the file past this function's scope; the clip's on_stop hook
    // below takes over cleanup once playback finishes.
    let temp_path = temp_file.into_temp_path().keep().map_err(|err| {
        crate::error::PlayerError::NetworkFailed(format!("failed to persist download: {err}"))
    })?;

    // `FileClip::new` synchronously probes metadata and starts a decoder
    // child process; run it on a blocking thread rather than the async
    // worker, matching `Scheduler::spawn`'s use of `spawn_blocking` for the
    // same reason.
    let decoder_bin = decoder_bin.to_string();
    let probe_bin = probe_bin.to_string();
    let label = episode.pub_date.format("%d.%m.%y - %H:%M").to_string();
    let clip_path = temp_path.clone();
    let cleanup_path = temp_path;
    let clip = tokio::task::spawn_blocking(move || {
        let mut clip = FileClip::new(clip_path, &decoder_bin, &probe_bin)?;
        clip.set_manual_metadata("News", label);
        clip.set_on_stop(Box::new(move || {
            if let Err(err) = std::fs::remove_file(&cleanup_path) {
                tracing::warn!(%err, path = %cleanup_path.display(), "failed to remove temporary news download");
            }
        }));
        Ok::<FileClip, crate::error::PlayerError>(clip)
    })
    .await
    .map_err(|err| {
        crate::error::PlayerError::NetworkFailed(format!(
            "news clip construction task panicked: {err}"
        ))
    })??;

    user_queue.push_back(Box::new(clip));
    Ok(())
}

fn latest_audio_episode(channel: &Channel) -> Option<LatestEpisode> {
    let mut latest: Option<LatestEpisode> = None;
    for item in channel.items() {
        let Some(enclosure) = item.enclosure() else {
            continue;
        };
        if enclosure.mime_type() != "audio/mpeg" {
            continue;
        }
        // `dc:date` (RFC 3339) wins over plain `pubDate` (RFC 1123Z) when
        // both are present, matching the feed's own resolution order.
        let dc_date = item
            .dublin_core_ext()
            .and_then(|dc| dc.dates().first())
            .and_then(|raw| parse_rfc3339(raw));
        let Some(pub_date) = dc_date.or_else(|| item.pub_date().and_then(parse_pub_date)) else {
            continue;
        };
        if latest.as_ref().map(|e| pub_date > e.pub_date).unwrap_or(true) {
            latest = Some(LatestEpisode {
                url: enclosure.url().to_string(),
                pub_date,
            });
        }
    }
    latest
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_rfc2822(trimmed))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
