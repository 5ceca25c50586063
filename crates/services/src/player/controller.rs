use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use course_core::model::{MediaSource, PlaybackStrategy, PlaybackSupport, QualityLevel};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::media::{HeadlessMedia, MediaElement};
use super::position::PositionClock;
use super::ticker::ProgressTicker;
use super::transport::{PLAYBACK_RATES, TransportState};
use crate::error::PlayerError;

/// Wall-clock period between progress reports while playing.
pub const PROGRESS_TICK: Duration = Duration::from_secs(10);

/// Notifications emitted to the lesson page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Truncated current position, sent every tick while playing.
    Progress(u32),
    /// Media reached its natural end. Sent at most once per playback session.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    /// Load or fatal stream error; `retry` is the only way out.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    /// Seconds to seek to once metadata is available.
    pub start_offset: u32,
    pub autoplay: bool,
    /// Suppresses the completion event when the lesson is already done.
    pub already_completed: bool,
    pub tick_period: Duration,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            start_offset: 0,
            autoplay: false,
            already_completed: false,
            tick_period: PROGRESS_TICK,
        }
    }
}

/// Client-side playback state for one lesson video.
///
/// Owns the progress timer: it is armed on play and dropped on pause, end,
/// failure, retry and when the controller itself is dropped.
pub struct PlaybackController<M: MediaElement = HeadlessMedia> {
    source: MediaSource,
    strategy: Option<PlaybackStrategy>,
    options: PlayerOptions,
    media: M,
    status: PlayerStatus,
    position: Arc<Mutex<PositionClock>>,
    transport: TransportState,
    events: UnboundedSender<PlaybackEvent>,
    ticker: Option<ProgressTicker>,
    completion_sent: bool,
}

impl<M: MediaElement> PlaybackController<M> {
    /// Pick a playback strategy for `url` and start loading it.
    ///
    /// An unsupported manifest leaves the controller in `Failed` so the page
    /// can show the error with a retry control.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Playback` if `url` is not a usable video URL.
    pub fn new(
        url: &str,
        support: PlaybackSupport,
        options: PlayerOptions,
        media: M,
    ) -> Result<(Self, UnboundedReceiver<PlaybackEvent>), PlayerError> {
        let source = MediaSource::parse(url)?;
        let (events, rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            strategy: PlaybackStrategy::select(&source, support).ok(),
            source,
            options,
            media,
            status: PlayerStatus::Loading,
            position: Arc::new(Mutex::new(PositionClock::default())),
            transport: TransportState::default(),
            events,
            ticker: None,
            completion_sent: false,
        };
        controller.load();
        Ok((controller, rx))
    }

    fn load(&mut self) {
        match self.strategy {
            Some(strategy) => {
                debug!(url = %self.source.url(), ?strategy, "loading video");
                self.media.load(self.source.url(), strategy);
                self.status = PlayerStatus::Loading;
            }
            None => {
                warn!(url = %self.source.url(), "no playback strategy for video");
                self.status = PlayerStatus::Failed(
                    course_core::model::PlaybackError::AdaptiveUnsupported.to_string(),
                );
            }
        }
    }

    fn position(&self) -> MutexGuard<'_, PositionClock> {
        // The clock holds plain data, so a poisoned lock is still usable.
        self.position
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    // ─── media feedback ─────────────────────────────────────────────────────

    /// Metadata arrived: apply the start offset and autoplay if requested.
    pub fn on_metadata(&mut self, duration_seconds: f64, levels: Vec<QualityLevel>) {
        if self.status != PlayerStatus::Loading {
            return;
        }
        let offset = f64::from(self.options.start_offset);
        {
            let mut clock = self.position();
            clock.set_duration(duration_seconds);
            if offset > 0.0 && offset < duration_seconds {
                clock.set(offset);
            }
        }
        if offset > 0.0 && offset < duration_seconds {
            self.media.seek(offset);
        }
        self.transport.levels = levels;
        self.transport.quality = None;
        self.status = PlayerStatus::Ready;

        if self.options.autoplay {
            if let Err(e) = self.play() {
                debug!(error = %e, "autoplay did not start");
            }
        }
    }

    /// Re-sync with the media element's own clock.
    pub fn sync_position(&mut self, position_seconds: f64) {
        self.position().set(position_seconds);
    }

    /// Natural end of media.
    pub fn on_ended(&mut self) {
        if matches!(self.status, PlayerStatus::Failed(_) | PlayerStatus::Ended) {
            return;
        }
        self.stop_ticker();
        {
            let mut clock = self.position();
            clock.stop();
            if let Some(d) = clock.duration() {
                clock.set(d);
            }
        }
        self.status = PlayerStatus::Ended;

        if !self.options.already_completed && !self.completion_sent {
            self.completion_sent = true;
            let _ = self.events.send(PlaybackEvent::Completed);
        }
    }

    /// Stream error from the media backend. Only fatal errors change state.
    pub fn on_error(&mut self, fatal: bool, message: impl Into<String>) {
        let message = message.into();
        if !fatal {
            debug!(%message, "recoverable playback error");
            return;
        }
        warn!(%message, "fatal playback error");
        self.stop_ticker();
        self.position().stop();
        self.status = PlayerStatus::Failed(message);
    }

    /// Reload after a failure. Starts a new playback session.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotReady` if the player has not failed.
    pub fn retry(&mut self) -> Result<(), PlayerError> {
        if !matches!(self.status, PlayerStatus::Failed(_)) {
            return Err(PlayerError::NotReady);
        }
        self.stop_ticker();
        *self.position() = PositionClock::default();
        self.completion_sent = false;
        self.load();
        Ok(())
    }

    // ─── transport ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `PlayerError::NotReady` while loading or failed.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        match self.status {
            PlayerStatus::Playing => return Ok(()),
            PlayerStatus::Loading | PlayerStatus::Failed(_) => return Err(PlayerError::NotReady),
            PlayerStatus::Ended => {
                self.position().set(0.0);
                self.media.seek(0.0);
            }
            PlayerStatus::Ready | PlayerStatus::Paused => {}
        }
        self.position().start();
        self.media.play();
        self.status = PlayerStatus::Playing;
        self.ticker = Some(ProgressTicker::start(
            self.options.tick_period,
            Arc::clone(&self.position),
            self.events.clone(),
        ));
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status != PlayerStatus::Playing {
            return;
        }
        self.stop_ticker();
        self.position().stop();
        self.media.pause();
        self.status = PlayerStatus::Paused;
    }

    /// # Errors
    ///
    /// Returns `PlayerError::NotReady` while loading or failed.
    pub fn toggle_play(&mut self) -> Result<(), PlayerError> {
        if self.status == PlayerStatus::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Scrub to `seconds`, clamped to the media duration.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotReady` before metadata is known.
    pub fn seek(&mut self, seconds: f64) -> Result<(), PlayerError> {
        if matches!(self.status, PlayerStatus::Loading | PlayerStatus::Failed(_)) {
            return Err(PlayerError::NotReady);
        }
        let target = {
            let mut clock = self.position();
            clock.set(seconds);
            clock.current()
        };
        self.media.seek(target);
        if self.status == PlayerStatus::Ended {
            self.status = PlayerStatus::Paused;
        }
        Ok(())
    }

    /// Volume in `[0, 1]`; any audible level also unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.transport.volume = volume;
        if volume > 0.0 {
            self.transport.muted = false;
        }
        self.media.set_volume(volume, self.transport.muted);
    }

    pub fn toggle_mute(&mut self) {
        self.transport.muted = !self.transport.muted;
        self.media
            .set_volume(self.transport.volume, self.transport.muted);
    }

    /// # Errors
    ///
    /// Returns `PlayerError::InvalidPlaybackRate` for speeds outside `PLAYBACK_RATES`.
    pub fn set_playback_rate(&mut self, rate: f32) -> Result<(), PlayerError> {
        if !PLAYBACK_RATES.contains(&rate) {
            return Err(PlayerError::InvalidPlaybackRate(rate));
        }
        self.position().set_rate(f64::from(rate));
        self.transport.playback_rate = rate;
        self.media.set_playback_rate(rate);
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) {
        self.transport.fullscreen = !self.transport.fullscreen;
        self.media.set_fullscreen(self.transport.fullscreen);
    }

    /// Pin a quality level, or `None` for automatic selection.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoQualityLevels` when the source exposes none, or
    /// `PlayerError::UnknownQualityLevel` for an out-of-range index.
    pub fn select_quality(&mut self, level: Option<usize>) -> Result<(), PlayerError> {
        if self.transport.levels.is_empty() {
            return Err(PlayerError::NoQualityLevels);
        }
        if let Some(index) = level {
            if index >= self.transport.levels.len() {
                return Err(PlayerError::UnknownQualityLevel(index));
            }
        }
        self.transport.quality = level;
        self.media.set_quality_level(level);
        Ok(())
    }

    // ─── accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    #[must_use]
    pub fn strategy(&self) -> Option<PlaybackStrategy> {
        self.strategy
    }

    #[must_use]
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    #[must_use]
    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.position().current()
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.position().duration()
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    #[must_use]
    pub fn media(&self) -> &M {
        &self.media
    }
}
