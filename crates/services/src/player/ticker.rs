use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::controller::PlaybackEvent;
use super::position::PositionClock;

/// Repeating progress timer owned by a playing controller.
///
/// The first tick fires one full period after `start`. Dropping the handle
/// aborts the task, so a paused or unmounted player never reports progress.
#[derive(Debug)]
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the timer on the current tokio runtime.
    #[must_use]
    pub fn start(
        period: Duration,
        position: Arc<Mutex<PositionClock>>,
        events: UnboundedSender<PlaybackEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let seconds = match position.lock() {
                    Ok(clock) => clock.whole_seconds(),
                    Err(_) => break,
                };
                if events.send(PlaybackEvent::Progress(seconds)).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
